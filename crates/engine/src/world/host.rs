use glam::Vec3;

use super::store::ObjectStore;

/// Minimal stand-in for the external physics engine: integrates the velocity
/// representation of every body the interaction layer does not drive itself.
///
/// Kinematic in-flight objects are skipped entirely (the transform stage owns
/// them), and gravity is never applied to kinematic or movement-suppressed
/// bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostStepper {
    pub gravity: Vec3,
}

impl HostStepper {
    pub fn new(gravity: Vec3) -> Self {
        Self { gravity }
    }

    pub fn step(&self, store: &mut ObjectStore, dt: f32) {
        for object in store.objects_mut() {
            let suppressed = object.is_movement_suppressed();
            let in_flight = object.in_flight.is_some();
            let Some(body) = object.body.as_mut() else {
                continue;
            };
            if body.is_kinematic() && in_flight {
                continue;
            }
            if !body.is_kinematic() && !suppressed {
                let factor = body.gravity_factor.unwrap_or(1.0);
                body.linear += self.gravity * factor * dt;
            }
            object.pose.advance(body.linear, body.angular, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{InFlightState, ObjectDesc, PhysicsBody, Pose};

    #[test]
    fn dynamic_bodies_fall_unless_suppressed() {
        let mut store = ObjectStore::default();
        let free = store.spawn(ObjectDesc::new("free", Vec3::ZERO).with_body(PhysicsBody::dynamic(1.0)));
        let held = store.spawn(
            ObjectDesc::new("held", Vec3::ZERO)
                .with_body(PhysicsBody::dynamic(1.0))
                .with_suppression_marker(true),
        );
        store.apply_pending();

        HostStepper::new(Vec3::new(0.0, -10.0, 0.0)).step(&mut store, 0.1);

        let free = store.find(free).expect("free");
        assert_eq!(free.body.expect("body").linear, Vec3::new(0.0, -1.0, 0.0));
        assert!((free.pose.position.y + 0.1).abs() < 1e-6);
        let held = store.find(held).expect("held");
        assert_eq!(held.body.expect("body").linear, Vec3::ZERO);
    }

    #[test]
    fn kinematic_in_flight_objects_are_left_alone() {
        let mut store = ObjectStore::default();
        let mut body = PhysicsBody::kinematic();
        body.linear = Vec3::X;
        let id = store.spawn(ObjectDesc::new("dart", Vec3::ZERO).with_body(body));
        store.apply_pending();
        store.find_mut(id).expect("dart").in_flight =
            Some(InFlightState::released_from(Pose::default(), Vec3::X));

        HostStepper::new(Vec3::new(0.0, -10.0, 0.0)).step(&mut store, 0.5);

        let dart = store.find(id).expect("dart");
        assert_eq!(dart.pose.position, Vec3::ZERO);
        assert_eq!(dart.body.expect("body").linear, Vec3::X);
    }
}
