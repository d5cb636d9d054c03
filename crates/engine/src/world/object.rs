use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::shape::Shape;

const ANGULAR_SPEED_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Explicit Euler step of position, plus an axis-angle rotation step when
    /// the angular speed is measurable.
    pub fn advance(&mut self, linear: Vec3, angular: Vec3, dt: f32) {
        self.position += linear * dt;
        let angular_speed = angular.length();
        if angular_speed > ANGULAR_SPEED_EPSILON {
            let delta = Quat::from_axis_angle(angular / angular_speed, angular_speed * dt);
            self.rotation = (delta * self.rotation).normalize();
        }
    }
}

/// Velocity representation of an object as seen by the external physics
/// engine. `inv_mass == 0` marks a kinematic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    pub linear: Vec3,
    pub angular: Vec3,
    pub inv_mass: f32,
    /// `None` means the object carries no explicit gravity factor.
    pub gravity_factor: Option<f32>,
}

impl PhysicsBody {
    pub fn dynamic(mass: f32) -> Self {
        let inv_mass = if mass.is_finite() && mass > 0.0 {
            mass.recip()
        } else {
            0.0
        };
        Self {
            linear: Vec3::ZERO,
            angular: Vec3::ZERO,
            inv_mass,
            gravity_factor: None,
        }
    }

    pub fn kinematic() -> Self {
        Self {
            linear: Vec3::ZERO,
            angular: Vec3::ZERO,
            inv_mass: 0.0,
            gravity_factor: None,
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.inv_mass <= 0.0
    }

    pub fn zero_velocity(&mut self) {
        self.linear = Vec3::ZERO;
        self.angular = Vec3::ZERO;
    }

    pub fn with_gravity_factor(mut self, factor: f32) -> Self {
        self.gravity_factor = Some(factor);
        self
    }
}

/// Capability tags checked directly by the affordance and pickup rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityTags {
    pub pickable: bool,
    pub never_pickable: bool,
    /// Eligible for world-grab when the object has no velocity representation.
    pub manipulable: bool,
    pub siphon_resource: Option<u16>,
    pub dump_storehouse: bool,
    pub dump_construction: bool,
    pub dump_ground: bool,
    pub castable_surface: bool,
    pub impact_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldTuning {
    pub follow_factor: f32,
    pub fallback_mass: f32,
}

impl Default for HoldTuning {
    fn default() -> Self {
        Self {
            follow_factor: 1.0,
            fallback_mass: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InFlightState {
    pub initial_velocity: Vec3,
    pub time_since_release: f32,
    pub prev_position: Vec3,
    pub prev_rotation: Quat,
    /// Set on release; the transform integrator keeps the release pose as the
    /// sweep origin for the first flight tick.
    pub fresh: bool,
}

impl InFlightState {
    pub fn released_from(pose: Pose, initial_velocity: Vec3) -> Self {
        Self {
            initial_velocity,
            time_since_release: 0.0,
            prev_position: pose.position,
            prev_rotation: pose.rotation,
            fresh: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimObject {
    pub id: ObjectId,
    pub debug_name: &'static str,
    pub pose: Pose,
    pub body: Option<PhysicsBody>,
    pub collider: Option<Shape>,
    pub tags: CapabilityTags,
    pub hold: HoldTuning,
    pub held_by: Option<HandId>,
    pub staged_by: Option<HandId>,
    /// `None` when the marker is absent; `Some(enabled)` otherwise.
    pub movement_suppressed: Option<bool>,
    pub in_flight: Option<InFlightState>,
    pub impacted: bool,
}

impl SimObject {
    pub fn is_kinematic_body(&self) -> bool {
        self.body.is_some_and(|body| body.is_kinematic())
    }

    pub fn is_movement_suppressed(&self) -> bool {
        self.movement_suppressed == Some(true)
    }
}

/// Spawn description consumed by [`super::ObjectStore::spawn`].
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    pub debug_name: &'static str,
    pub pose: Pose,
    pub body: Option<PhysicsBody>,
    pub collider: Option<Shape>,
    pub tags: CapabilityTags,
    pub hold: HoldTuning,
    pub movement_suppressed: Option<bool>,
}

impl ObjectDesc {
    pub fn new(debug_name: &'static str, position: Vec3) -> Self {
        Self {
            debug_name,
            pose: Pose::at(position),
            body: None,
            collider: None,
            tags: CapabilityTags::default(),
            hold: HoldTuning::default(),
            movement_suppressed: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.pose.rotation = rotation;
        self
    }

    pub fn with_body(mut self, body: PhysicsBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_collider(mut self, collider: Shape) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_tags(mut self, tags: CapabilityTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_follow_factor(mut self, follow_factor: f32) -> Self {
        self.hold.follow_factor = follow_factor;
        self
    }

    pub fn with_fallback_mass(mut self, fallback_mass: f32) -> Self {
        self.hold.fallback_mass = fallback_mass;
        self
    }

    pub fn with_suppression_marker(mut self, enabled: bool) -> Self {
        self.movement_suppressed = Some(enabled);
        self
    }
}
