mod affordance;
mod command;
mod config;
mod diagnostics;
mod events;
mod gravity;
mod hand;
mod hold;
mod hover;
mod pickup;
mod pipeline;
mod queue;
mod sweep;
mod throw;
mod transform;

pub use affordance::{
    can_pick_up, pickup_eligible, resolve_affordances, world_grab_permitted, Affordance,
    AffordanceSet,
};
pub use command::{Command, CommandApplyStats, CommandKind, CommandKindCounts, CommandQueue};
pub use config::{
    ConfigError, InteractionConfig, InteractionPolicy, InteractionTuning, MissingComponentMode,
};
pub use diagnostics::{DiagnosticKind, DiagnosticLog};
pub use events::{
    ImpactEvent, InteractionEvent, InteractionEventBus, InteractionEventCounts, ReleaseKind,
};
pub use gravity::effective_gravity_factor;
pub use hand::{HandController, HandPhase, HandState, ThrowQueue, ThrowQueueEntry};
pub use hold::{clamp_follow_factor, effective_mass, spring_follow_velocity};
pub use hover::resolve_hover;
pub use pickup::PickupRejection;
pub use pipeline::{HandFrame, InteractionPipeline, SimMode, StageId, TickReport, STAGE_ORDER};
pub use sweep::impact_point;
pub use throw::{slingshot_speed, throw_velocity};
