use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::object::{ObjectId, Pose};
use super::shape::{ray_cast_shape, shapes_overlap, Aabb, Shape};
use super::store::ObjectStore;

const MIN_DIRECTION_LENGTH: f32 = 1e-6;
const MIN_SWEEP_STEP: f32 = 1e-3;
const MAX_SWEEP_SAMPLES: u32 = 512;
const SWEEP_REFINE_ITERATIONS: u32 = 24;
const CLOSEST_APPROACH_ITERATIONS: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub object: ObjectId,
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub object: ObjectId,
    /// Earliest overlapping fraction of the `from -> to` segment, in `[0, 1]`.
    /// Zero when the mover starts pressed against the collider.
    pub fraction: f32,
    pub position: Vec3,
    pub normal: Vec3,
}

/// Read-only spatial queries the interaction stages issue against the
/// physics world.
pub trait WorldQuery {
    fn ray_cast(&self, ray: Ray, max_distance: f32, ignore: Option<ObjectId>) -> Option<RayHit>;

    fn sweep_shape(
        &self,
        shape: &Shape,
        rotation: Quat,
        from: Vec3,
        to: Vec3,
        ignore: Option<ObjectId>,
    ) -> Option<SweepHit>;
}

#[derive(Debug, Clone)]
struct ColliderEntry {
    id: ObjectId,
    pose: Pose,
    shape: Shape,
    aabb: Aabb,
}

/// Collider snapshot of the object store. Entries keep the store's ascending
/// id order, which is what every tie-break below relies on.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    entries: Vec<ColliderEntry>,
}

impl CollisionWorld {
    pub fn rebuild(&mut self, store: &ObjectStore) {
        self.entries.clear();
        for object in store.objects() {
            let Some(shape) = object.collider else {
                continue;
            };
            self.entries.push(ColliderEntry {
                id: object.id,
                pose: object.pose,
                shape,
                aabb: shape.aabb(&object.pose),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WorldQuery for CollisionWorld {
    fn ray_cast(&self, ray: Ray, max_distance: f32, ignore: Option<ObjectId>) -> Option<RayHit> {
        let length = ray.direction.length();
        if !length.is_finite() || length < MIN_DIRECTION_LENGTH {
            return None;
        }
        let direction = ray.direction / length;

        let mut best: Option<RayHit> = None;
        for entry in &self.entries {
            if Some(entry.id) == ignore {
                continue;
            }
            let Some((distance, normal)) =
                ray_cast_shape(&entry.shape, &entry.pose, ray.origin, direction, max_distance)
            else {
                continue;
            };
            // Strictly closer only: equal distances keep the lower id seen first.
            if best.map_or(true, |current| distance < current.distance) {
                best = Some(RayHit {
                    object: entry.id,
                    position: ray.origin + direction * distance,
                    normal,
                    distance,
                });
            }
        }
        best
    }

    fn sweep_shape(
        &self,
        shape: &Shape,
        rotation: Quat,
        from: Vec3,
        to: Vec3,
        ignore: Option<ObjectId>,
    ) -> Option<SweepHit> {
        let travel = to - from;
        let length = travel.length();
        if !length.is_finite() || length < MIN_DIRECTION_LENGTH {
            return None;
        }

        let start = Pose {
            position: from,
            rotation,
        };
        let end = Pose {
            position: to,
            rotation,
        };
        let swept = shape.aabb(&start).union(&shape.aabb(&end));

        let mut candidates = Vec::new();
        for entry in self
            .entries
            .iter()
            .filter(|entry| Some(entry.id) != ignore)
            .filter(|entry| entry.aabb.overlaps(&swept))
        {
            if !shapes_overlap(shape, &start, &entry.shape, &entry.pose) {
                candidates.push(entry);
                continue;
            }
            // Touching at the start: pressing further in is an immediate hit,
            // sliding along or leaving is not.
            if let Some(normal) = pressing_normal(entry, from, travel) {
                return Some(SweepHit {
                    object: entry.id,
                    fraction: 0.0,
                    position: from,
                    normal,
                });
            }
        }
        if candidates.is_empty() {
            return None;
        }

        match *shape {
            Shape::Sphere { radius } => sweep_sphere(&candidates, radius, from, travel),
            _ => sweep_sampled(&candidates, shape, rotation, from, travel),
        }
    }
}

/// Outward normal of `entry` at `from` when `travel` points into it.
fn pressing_normal(entry: &ColliderEntry, from: Vec3, travel: Vec3) -> Option<Vec3> {
    let mut outward = from - entry.shape.closest_point(&entry.pose, from);
    if outward.length_squared() <= MIN_DIRECTION_LENGTH * MIN_DIRECTION_LENGTH {
        outward = from - entry.pose.position;
    }
    (travel.dot(outward) < 0.0).then(|| outward.normalize_or(-travel.normalize_or_zero()))
}

/// Sphere movers are solved per candidate: the distance from a point moving
/// along a line to a convex solid is convex, so a ternary search finds the
/// closest approach and a bisection before it finds first contact.
fn sweep_sphere(
    candidates: &[&ColliderEntry],
    radius: f32,
    from: Vec3,
    travel: Vec3,
) -> Option<SweepHit> {
    let mut best: Option<SweepHit> = None;
    for entry in candidates {
        let gap = |fraction: f32| {
            let center = from + travel * fraction;
            center.distance(entry.shape.closest_point(&entry.pose, center))
        };

        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..CLOSEST_APPROACH_ITERATIONS {
            let near = lo + (hi - lo) / 3.0;
            let far = hi - (hi - lo) / 3.0;
            if gap(near) < gap(far) {
                hi = far;
            } else {
                lo = near;
            }
        }
        let closest = (lo + hi) * 0.5;
        if gap(closest) > radius {
            continue;
        }

        let (mut clear, mut touching) = (0.0f32, closest);
        for _ in 0..SWEEP_REFINE_ITERATIONS {
            let mid = (clear + touching) * 0.5;
            if gap(mid) <= radius {
                touching = mid;
            } else {
                clear = mid;
            }
        }
        // Strictly earlier only: equal fractions keep the lower id seen first.
        if best.is_some_and(|current| current.fraction <= touching) {
            continue;
        }
        let clear_position = from + travel * clear;
        let contact = entry.shape.closest_point(&entry.pose, clear_position);
        best = Some(SweepHit {
            object: entry.id,
            fraction: touching,
            position: from + travel * touching,
            normal: (clear_position - contact).normalize_or(-travel.normalize_or_zero()),
        });
    }
    best
}

/// Box and capsule movers step at their thinnest half width, so a glancing
/// contact shorter than one step can slip between samples.
fn sweep_sampled(
    candidates: &[&ColliderEntry],
    shape: &Shape,
    rotation: Quat,
    from: Vec3,
    travel: Vec3,
) -> Option<SweepHit> {
    let length = travel.length();
    let pose_at = |fraction: f32| Pose {
        position: from + travel * fraction,
        rotation,
    };
    let first_overlap = |fraction: f32| {
        let pose = pose_at(fraction);
        candidates
            .iter()
            .copied()
            .find(|entry| shapes_overlap(shape, &pose, &entry.shape, &entry.pose))
    };

    let step = shape.min_half_extent().max(MIN_SWEEP_STEP);
    let samples = ((length / step).ceil() as u32).clamp(1, MAX_SWEEP_SAMPLES);

    let mut previous = 0.0f32;
    for sample in 1..=samples {
        let fraction = sample as f32 / samples as f32;
        if first_overlap(fraction).is_none() {
            previous = fraction;
            continue;
        }

        let mut lo = previous;
        let mut hi = fraction;
        for _ in 0..SWEEP_REFINE_ITERATIONS {
            let mid = (lo + hi) * 0.5;
            if first_overlap(mid).is_some() {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let entry = first_overlap(hi)?;
        let clear_position = pose_at(lo).position;
        let contact = entry.shape.closest_point(&entry.pose, clear_position);
        let normal = (clear_position - contact).normalize_or(-travel / length);
        return Some(SweepHit {
            object: entry.id,
            fraction: hi,
            position: pose_at(hi).position,
            normal,
        });
    }
    None
}
