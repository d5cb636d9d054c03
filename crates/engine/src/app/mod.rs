mod input;
mod loop_runner;
mod metrics;

pub use input::{HandAction, HandInput, ReleaseEdgeDetector, ReleaseTrigger};
pub use loop_runner::{
    run_fixed_step, run_fixed_step_with_metrics, LoopCommand, LoopConfig, LoopSummary,
    Simulation,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle, TickSample};
