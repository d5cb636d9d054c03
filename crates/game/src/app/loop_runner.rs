use std::collections::BTreeMap;
use std::process::ExitCode;

use interaction_engine::{
    run_fixed_step, world_digest, CommandLog, HandId, HandInput, HostStepper, InteractionConfig,
    InteractionPipeline, LoopCommand, ObjectStore, SimMode, Simulation, TickRecord, TickSample,
};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, RunSource};
use super::demo::{build_demo_world, DemoDirector, DEMO_HAND};
use super::replay::{write_command_log, ReplaySource};

/// Where each tick's inputs and commands come from.
pub(crate) trait TickSource {
    /// `None` ends the run.
    fn next_record(
        &mut self,
        tick: u64,
        world: &ObjectStore,
        pipeline: &InteractionPipeline,
    ) -> Option<TickRecord>;
}

pub(crate) struct HandSim {
    world: ObjectStore,
    pipeline: InteractionPipeline,
    host: HostStepper,
    source: Box<dyn TickSource>,
    /// Replays use the recorded step instead of the loop's.
    fixed_dt: Option<f32>,
    recording: Option<CommandLog>,
    last_impacts: u32,
    total_impacts: u32,
}

pub(crate) struct SimOutcome {
    pub(crate) digest: String,
    pub(crate) recording: Option<CommandLog>,
    pub(crate) total_impacts: u32,
}

impl HandSim {
    pub(crate) fn new(config: InteractionConfig, source: RunSource, record: bool) -> Self {
        let mut world = ObjectStore::default();
        let objects = build_demo_world(&mut world);
        let mut pipeline = InteractionPipeline::new(config);
        pipeline.register_hand(DEMO_HAND);

        let (source, fixed_dt): (Box<dyn TickSource>, Option<f32>) = match source {
            RunSource::Demo => (Box::new(DemoDirector::new(&objects)), None),
            RunSource::Replay(log) => {
                let fixed_dt = log.fixed_dt;
                (Box::new(ReplaySource::new(log)), Some(fixed_dt))
            }
        };

        Self {
            world,
            host: HostStepper::new(config.tuning.gravity),
            pipeline,
            source,
            fixed_dt,
            recording: record.then(|| CommandLog::new(fixed_dt.unwrap_or_default())),
            last_impacts: 0,
            total_impacts: 0,
        }
    }

    pub(crate) fn finish(self) -> SimOutcome {
        SimOutcome {
            digest: world_digest(&self.world, &self.pipeline),
            recording: self.recording,
            total_impacts: self.total_impacts,
        }
    }
}

impl Simulation for HandSim {
    fn update(&mut self, tick: u64, fixed_dt_seconds: f32) -> LoopCommand {
        let dt = self.fixed_dt.unwrap_or(fixed_dt_seconds);
        let Some(record) = self.source.next_record(tick, &self.world, &self.pipeline) else {
            return LoopCommand::Stop;
        };

        let inputs: BTreeMap<HandId, HandInput> = record
            .inputs
            .iter()
            .map(|entry| (entry.hand, entry.input))
            .collect();
        for command in &record.commands {
            self.pipeline.submit(*command);
        }
        let report = self
            .pipeline
            .run_tick(record.tick, dt, record.mode, &inputs, &mut self.world);
        if record.mode == SimMode::Live {
            self.host.step(&mut self.world, dt);
        }

        self.last_impacts = report.events.impacts;
        self.total_impacts = self.total_impacts.saturating_add(report.events.impacts);
        if let Some(log) = self.recording.as_mut() {
            log.fixed_dt = dt;
            log.record(record);
        }
        LoopCommand::Continue
    }

    fn tick_sample(&self) -> TickSample {
        TickSample {
            held_count: self.world.held_count() as u32,
            in_flight_count: self.world.in_flight_count() as u32,
            impacts: self.last_impacts,
        }
    }

    fn shutdown(&mut self) {
        info!(
            objects = self.world.len(),
            held = self.world.held_count(),
            in_flight = self.world.in_flight_count(),
            impacts = self.total_impacts,
            diagnostics = self.pipeline.diagnostics().len(),
            "simulation_shutdown"
        );
    }
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        loop_config,
        interaction,
        source,
        record_path,
    } = app;
    let expected_digest = match &source {
        RunSource::Replay(log) => log.final_digest.clone(),
        RunSource::Demo => None,
    };

    let mut simulation = HandSim::new(interaction, source, record_path.is_some());
    let summary = run_fixed_step(loop_config, &mut simulation);
    let outcome = simulation.finish();
    info!(
        ticks = summary.ticks_run,
        stopped_by_simulation = summary.stopped_by_simulation,
        digest = %outcome.digest,
        "run_finished"
    );

    if let Some(expected) = expected_digest {
        if !summary.stopped_by_simulation {
            warn!("replay_truncated_digest_not_checked");
        } else if expected != outcome.digest {
            error!(expected = %expected, actual = %outcome.digest, "replay_digest_mismatch");
            return ExitCode::FAILURE;
        } else {
            info!("replay_digest_matched");
        }
    }

    if let (Some(path), Some(mut log)) = (record_path, outcome.recording) {
        log.final_digest = Some(outcome.digest);
        if let Err(message) = write_command_log(&log, &path) {
            error!(error = %message, "record_failed");
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), ticks = log.ticks.len(), "command_log_written");
    }

    ExitCode::SUCCESS
}
