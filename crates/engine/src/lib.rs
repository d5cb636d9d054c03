pub mod app;
mod command_log;
mod digest;
pub mod interaction;
pub mod world;

pub use app::{
    run_fixed_step, run_fixed_step_with_metrics, HandAction, HandInput, LoopCommand, LoopConfig,
    LoopMetricsSnapshot, LoopSummary, MetricsHandle, ReleaseEdgeDetector, ReleaseTrigger,
    Simulation, TickSample,
};
pub use command_log::{
    CommandLog, CommandLogError, HandInputRecord, TickRecord, COMMAND_LOG_FORMAT_VERSION,
};
pub use digest::world_digest;
pub use interaction::{
    Command, CommandKind, ConfigError, HandPhase, InteractionConfig, InteractionEvent,
    InteractionPipeline, InteractionPolicy, InteractionTuning, MissingComponentMode, ReleaseKind,
    SimMode, StageId, TickReport, STAGE_ORDER,
};
pub use world::{
    CapabilityTags, CollisionWorld, HandId, HostStepper, ObjectDesc, ObjectId, ObjectStore,
    PhysicsBody, Pose, Ray, Shape, SimObject,
};
