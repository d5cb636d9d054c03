mod collision;
mod host;
mod object;
mod shape;
mod store;

pub use collision::{CollisionWorld, Ray, RayHit, SweepHit, WorldQuery};
pub use host::HostStepper;
pub use object::{
    CapabilityTags, HandId, HoldTuning, InFlightState, ObjectDesc, ObjectId, PhysicsBody, Pose,
    SimObject,
};
pub use shape::{shapes_overlap, Aabb, Shape};
pub use store::{ApplyPendingStats, MarkerMutation, ObjectIdAllocator, ObjectStore};
