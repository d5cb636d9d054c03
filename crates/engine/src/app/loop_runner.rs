use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::metrics::{MetricsAccumulator, TickSample};
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many ticks; `None` runs until the simulation asks to stop.
    pub tick_limit: Option<u64>,
    /// Pace ticks against the wall clock; otherwise run headless as fast as possible.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            tick_limit: None,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Continue,
    Stop,
}

/// Fixed-timestep simulation driven by [`run_fixed_step`].
pub trait Simulation {
    fn update(&mut self, tick: u64, fixed_dt_seconds: f32) -> LoopCommand;

    fn tick_sample(&self) -> TickSample;

    fn shutdown(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub stopped_by_simulation: bool,
    pub dropped_backlog: Duration,
}

pub fn run_fixed_step(config: LoopConfig, simulation: &mut dyn Simulation) -> LoopSummary {
    run_fixed_step_with_metrics(config, simulation, MetricsHandle::default())
}

pub fn run_fixed_step_with_metrics(
    config: LoopConfig,
    simulation: &mut dyn Simulation,
    metrics_handle: MetricsHandle,
) -> LoopSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        realtime = config.realtime,
        tick_limit = ?config.tick_limit,
        "loop_config"
    );

    let mut summary = LoopSummary::default();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();

    'frames: loop {
        let ticks_this_frame = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                summary.dropped_backlog = summary
                    .dropped_backlog
                    .saturating_add(step_plan.dropped_backlog);
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            step_plan.ticks_to_run
        } else {
            1
        };

        for _ in 0..ticks_this_frame {
            if config
                .tick_limit
                .is_some_and(|limit| summary.ticks_run >= limit)
            {
                break 'frames;
            }
            let command = simulation.update(summary.ticks_run, fixed_dt_seconds);
            summary.ticks_run = summary.ticks_run.saturating_add(1);
            metrics_accumulator.record_tick(simulation.tick_sample());
            if command == LoopCommand::Stop {
                summary.stopped_by_simulation = true;
                break 'frames;
            }
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                held_count = snapshot.held_count,
                in_flight_count = snapshot.in_flight_count,
                impacts = snapshot.impacts,
                "loop_metrics"
            );
        }

        if config.realtime {
            let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            let pacing_sleep = compute_pacing_sleep(elapsed, fixed_dt);
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }
        }
    }

    simulation.shutdown();
    info!(
        ticks_run = summary.ticks_run,
        stopped_by_simulation = summary.stopped_by_simulation,
        "shutdown"
    );
    summary
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pacing_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
