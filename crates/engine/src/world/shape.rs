use glam::{Mat3, Quat, Vec3};

use super::object::Pose;

const EPSILON: f32 = 1e-6;
const SEGMENT_BOX_SEARCH_ITERATIONS: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Inner segment runs along local Y from `-half_height` to `half_height`.
    Capsule { radius: f32, half_height: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Shape {
    pub fn aabb(&self, pose: &Pose) -> Aabb {
        match *self {
            Shape::Sphere { radius } => {
                Aabb::from_center_half_extents(pose.position, Vec3::splat(radius))
            }
            Shape::Box { half_extents } => {
                let rot = Mat3::from_quat(pose.rotation);
                let abs = Mat3::from_cols(rot.x_axis.abs(), rot.y_axis.abs(), rot.z_axis.abs());
                Aabb::from_center_half_extents(pose.position, abs * half_extents)
            }
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let axis = pose.rotation * Vec3::Y * half_height.abs();
                Aabb::from_center_half_extents(pose.position, axis.abs() + Vec3::splat(radius))
            }
        }
    }

    /// Half of the shape's thinnest width; bounds the sweep sample spacing.
    pub fn min_half_extent(&self) -> f32 {
        match *self {
            Shape::Sphere { radius } => radius,
            Shape::Box { half_extents } => half_extents.min_element(),
            Shape::Capsule { radius, .. } => radius,
        }
    }

    /// Closest point of the solid shape to `point`; `point` itself when inside.
    pub fn closest_point(&self, pose: &Pose, point: Vec3) -> Vec3 {
        let (core, radius) = core_of(self, pose);
        let on_core = match core {
            Core::Point(center) => center,
            Core::Segment(a, b) => closest_point_on_segment(a, b, point).0,
            Core::Box {
                center,
                rotation,
                half_extents,
            } => closest_point_on_box(center, rotation, half_extents, point),
        };
        let offset = point - on_core;
        let distance = offset.length();
        if distance <= radius {
            point
        } else {
            on_core + offset * (radius / distance)
        }
    }
}

/// Every supported shape is a core (point, segment or box) inflated by a radius.
#[derive(Debug, Clone, Copy)]
enum Core {
    Point(Vec3),
    Segment(Vec3, Vec3),
    Box {
        center: Vec3,
        rotation: Quat,
        half_extents: Vec3,
    },
}

fn core_of(shape: &Shape, pose: &Pose) -> (Core, f32) {
    match *shape {
        Shape::Sphere { radius } => (Core::Point(pose.position), radius),
        Shape::Box { half_extents } => (
            Core::Box {
                center: pose.position,
                rotation: pose.rotation,
                half_extents,
            },
            0.0,
        ),
        Shape::Capsule {
            radius,
            half_height,
        } => {
            let axis = pose.rotation * Vec3::Y * half_height;
            (
                Core::Segment(pose.position + axis, pose.position - axis),
                radius,
            )
        }
    }
}

pub fn shapes_overlap(a: &Shape, pose_a: &Pose, b: &Shape, pose_b: &Pose) -> bool {
    let (core_a, radius_a) = core_of(a, pose_a);
    let (core_b, radius_b) = core_of(b, pose_b);
    let reach = radius_a + radius_b;
    match core_distance_sq(&core_a, &core_b) {
        Some(distance_sq) => distance_sq <= reach * reach,
        None => match (core_a, core_b) {
            (
                Core::Box {
                    center: ca,
                    rotation: ra,
                    half_extents: ea,
                },
                Core::Box {
                    center: cb,
                    rotation: rb,
                    half_extents: eb,
                },
            ) => obb_overlap(ca, ra, ea, cb, rb, eb),
            _ => false,
        },
    }
}

/// Squared distance between two cores; `None` for box/box, which is tested
/// with separating axes instead.
fn core_distance_sq(a: &Core, b: &Core) -> Option<f32> {
    match (*a, *b) {
        (Core::Point(p), Core::Point(q)) => Some(p.distance_squared(q)),
        (Core::Point(p), Core::Segment(s0, s1)) => {
            Some(p.distance_squared(closest_point_on_segment(s0, s1, p).0))
        }
        (
            Core::Point(p),
            Core::Box {
                center,
                rotation,
                half_extents,
            },
        ) => Some(p.distance_squared(closest_point_on_box(center, rotation, half_extents, p))),
        (Core::Segment(p0, p1), Core::Segment(q0, q1)) => {
            Some(segment_segment_distance_sq(p0, p1, q0, q1))
        }
        (
            Core::Segment(s0, s1),
            Core::Box {
                center,
                rotation,
                half_extents,
            },
        ) => Some(segment_box_distance_sq(
            s0,
            s1,
            center,
            rotation,
            half_extents,
        )),
        (Core::Box { .. }, Core::Box { .. }) => None,
        (Core::Segment(..), Core::Point(..))
        | (Core::Box { .. }, Core::Point(..))
        | (Core::Box { .. }, Core::Segment(..)) => core_distance_sq(b, a),
    }
}

pub(crate) fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom < EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / denom).clamp(0.0, 1.0);
    (a + ab * t, t)
}

fn closest_point_on_box(center: Vec3, rotation: Quat, half_extents: Vec3, p: Vec3) -> Vec3 {
    let local = rotation.inverse() * (p - center);
    let clamped = local.clamp(-half_extents, half_extents);
    center + rotation * clamped
}

fn segment_segment_distance_sq(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> f32 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom.abs() > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    c1.distance_squared(c2)
}

/// Distance from a point on the segment to a convex box is convex in the
/// segment parameter, so a ternary search finds the minimum.
fn segment_box_distance_sq(
    s0: Vec3,
    s1: Vec3,
    center: Vec3,
    rotation: Quat,
    half_extents: Vec3,
) -> f32 {
    let distance_at = |t: f32| {
        let p = s0.lerp(s1, t);
        p.distance_squared(closest_point_on_box(center, rotation, half_extents, p))
    };

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    for _ in 0..SEGMENT_BOX_SEARCH_ITERATIONS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if distance_at(m1) <= distance_at(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    distance_at((lo + hi) * 0.5)
        .min(distance_at(0.0))
        .min(distance_at(1.0))
}

fn obb_overlap(
    center_a: Vec3,
    rotation_a: Quat,
    extents_a: Vec3,
    center_b: Vec3,
    rotation_b: Quat,
    extents_b: Vec3,
) -> bool {
    let axes_a = Mat3::from_quat(rotation_a);
    let axes_b = Mat3::from_quat(rotation_b);
    let a = [axes_a.x_axis, axes_a.y_axis, axes_a.z_axis];
    let b = [axes_b.x_axis, axes_b.y_axis, axes_b.z_axis];
    let ea = extents_a.to_array();
    let eb = extents_b.to_array();

    let mut r = [[0.0f32; 3]; 3];
    let mut abs_r = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            r[i][j] = a[i].dot(b[j]);
            // Epsilon keeps near-parallel edge pairs from producing a false separation.
            abs_r[i][j] = r[i][j].abs() + EPSILON;
        }
    }

    let offset = center_b - center_a;
    let t = [offset.dot(a[0]), offset.dot(a[1]), offset.dot(a[2])];

    for i in 0..3 {
        let ra = ea[i];
        let rb = eb[0] * abs_r[i][0] + eb[1] * abs_r[i][1] + eb[2] * abs_r[i][2];
        if t[i].abs() > ra + rb {
            return false;
        }
    }

    for j in 0..3 {
        let ra = ea[0] * abs_r[0][j] + ea[1] * abs_r[1][j] + ea[2] * abs_r[2][j];
        let rb = eb[j];
        let projected = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
        if projected.abs() > ra + rb {
            return false;
        }
    }

    for i in 0..3 {
        let i1 = (i + 1) % 3;
        let i2 = (i + 2) % 3;
        for j in 0..3 {
            let j1 = (j + 1) % 3;
            let j2 = (j + 2) % 3;
            let ra = ea[i1] * abs_r[i2][j] + ea[i2] * abs_r[i1][j];
            let rb = eb[j1] * abs_r[i][j2] + eb[j2] * abs_r[i][j1];
            let projected = t[i2] * r[i1][j] - t[i1] * r[i2][j];
            if projected.abs() > ra + rb {
                return false;
            }
        }
    }

    true
}

/// Ray against a solid shape. `direction` must be unit length. An origin
/// inside the shape reports a hit at distance zero facing the ray.
pub fn ray_cast_shape(
    shape: &Shape,
    pose: &Pose,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let hit = match *shape {
        Shape::Sphere { radius } => ray_sphere(origin, direction, pose.position, radius),
        Shape::Box { half_extents } => ray_box(
            origin,
            direction,
            pose.position,
            pose.rotation,
            half_extents,
        ),
        Shape::Capsule {
            radius,
            half_height,
        } => {
            let axis = pose.rotation * Vec3::Y * half_height;
            ray_capsule(
                origin,
                direction,
                pose.position + axis,
                pose.position - axis,
                radius,
            )
        }
    }?;
    (hit.0 <= max_distance).then_some(hit)
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.dot(m) - radius * radius;
    if c <= 0.0 {
        return Some((0.0, -direction));
    }
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()).max(0.0);
    let normal = (origin + direction * t - center).normalize_or(-direction);
    Some((t, normal))
}

fn ray_box(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    rotation: Quat,
    half_extents: Vec3,
) -> Option<(f32, Vec3)> {
    let inverse = rotation.inverse();
    let local_origin = inverse * (origin - center);
    let local_direction = inverse * direction;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0usize;
    for axis in 0..3 {
        let o = local_origin[axis];
        let d = local_direction[axis];
        let extent = half_extents[axis];
        if d.abs() < EPSILON {
            if o < -extent || o > extent {
                return None;
            }
            continue;
        }
        let inv = d.recip();
        let mut t1 = (-extent - o) * inv;
        let mut t2 = (extent - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_enter {
            t_enter = t1;
            enter_axis = axis;
        }
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    if t_exit < 0.0 {
        return None;
    }
    if t_enter <= 0.0 {
        return Some((0.0, -direction));
    }
    let mut local_normal = Vec3::ZERO;
    local_normal[enter_axis] = -local_direction[enter_axis].signum();
    Some((t_enter, rotation * local_normal))
}

fn ray_capsule(
    origin: Vec3,
    direction: Vec3,
    top: Vec3,
    bottom: Vec3,
    radius: f32,
) -> Option<(f32, Vec3)> {
    let (closest, _) = closest_point_on_segment(top, bottom, origin);
    if origin.distance_squared(closest) <= radius * radius {
        return Some((0.0, -direction));
    }

    let mut best = [
        ray_sphere(origin, direction, top, radius),
        ray_sphere(origin, direction, bottom, radius),
    ]
    .into_iter()
    .flatten()
    .min_by(|a, b| a.0.total_cmp(&b.0));

    let axis = bottom - top;
    let length = axis.length();
    if length < EPSILON {
        return best;
    }
    let unit = axis / length;
    let m = origin - top;
    let md = m.dot(unit);
    let dd = direction.dot(unit);
    let m_perp = m - unit * md;
    let d_perp = direction - unit * dd;
    let a = d_perp.dot(d_perp);
    if a < EPSILON {
        return best;
    }
    let b = m_perp.dot(d_perp);
    let c = m_perp.dot(m_perp) - radius * radius;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return best;
    }
    let t = (-b - discriminant.sqrt()) / a;
    if t >= 0.0 {
        let s = md + t * dd;
        if (0.0..=length).contains(&s) && best.map_or(true, |(best_t, _)| t < best_t) {
            let normal = (m_perp + d_perp * t).normalize_or(-direction);
            best = Some((t, normal));
        }
    }
    best
}
