use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::affordance::{self, AffordanceSet};
use super::command::{Command, CommandApplyStats, CommandQueue};
use super::config::{InteractionConfig, InteractionPolicy, InteractionTuning};
use super::diagnostics::DiagnosticLog;
use super::events::{InteractionEventBus, InteractionEventCounts};
use super::hand::{HandController, HandPhase, HandState};
use super::{gravity, hold, hover, pickup, queue, sweep, throw, transform};
use crate::app::HandInput;
use crate::world::{ApplyPendingStats, CollisionWorld, HandId, ObjectStore, RayHit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    Housekeeping,
    Hover,
    Affordance,
    Pickup,
    Hold,
    QueueThrow,
    QueueRelease,
    Throw,
    Slingshot,
    Gravity,
    Transform,
    CollisionRebuild,
    Sweep,
}

impl StageId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Housekeeping => "Housekeeping",
            Self::Hover => "Hover",
            Self::Affordance => "Affordance",
            Self::Pickup => "Pickup",
            Self::Hold => "Hold",
            Self::QueueThrow => "QueueThrow",
            Self::QueueRelease => "QueueRelease",
            Self::Throw => "Throw",
            Self::Slingshot => "Slingshot",
            Self::Gravity => "Gravity",
            Self::Transform => "Transform",
            Self::CollisionRebuild => "CollisionRebuild",
            Self::Sweep => "Sweep",
        }
    }
}

pub const STAGE_ORDER: [StageId; 13] = [
    StageId::Housekeeping,
    StageId::Hover,
    StageId::Affordance,
    StageId::Pickup,
    StageId::Hold,
    StageId::QueueThrow,
    StageId::QueueRelease,
    StageId::Throw,
    StageId::Slingshot,
    StageId::Gravity,
    StageId::Transform,
    StageId::CollisionRebuild,
    StageId::Sweep,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimMode {
    #[default]
    Live,
    Playback,
    Rewind,
}

/// What a hand sees this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandFrame {
    pub hover: Option<RayHit>,
    pub affordances: AffordanceSet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// `false` when the tick was skipped (non-live mode or a repeated tick).
    pub ran: bool,
    pub commands: CommandApplyStats,
    pub events: InteractionEventCounts,
    pub mutations: ApplyPendingStats,
    pub despawned: u32,
}

pub(crate) struct StageContext<'a> {
    pub(crate) tick: u64,
    pub(crate) dt: f32,
    pub(crate) config: &'a InteractionConfig,
    pub(crate) inputs: &'a BTreeMap<HandId, HandInput>,
    pub(crate) world: &'a mut ObjectStore,
    pub(crate) hands: &'a mut BTreeMap<HandId, HandController>,
    pub(crate) frames: &'a mut BTreeMap<HandId, HandFrame>,
    pub(crate) commands: &'a mut CommandQueue,
    pub(crate) collision: &'a mut CollisionWorld,
    pub(crate) events: &'a mut InteractionEventBus,
    pub(crate) diagnostics: &'a mut DiagnosticLog,
    pub(crate) stats: &'a mut CommandApplyStats,
}

/// Explicit per-tick driver: runs every interaction stage in [`STAGE_ORDER`]
/// against a caller-owned [`ObjectStore`].
#[derive(Debug, Default)]
pub struct InteractionPipeline {
    config: InteractionConfig,
    hands: BTreeMap<HandId, HandController>,
    frames: BTreeMap<HandId, HandFrame>,
    commands: CommandQueue,
    collision: CollisionWorld,
    events: InteractionEventBus,
    diagnostics: DiagnosticLog,
    last_tick_order: Vec<StageId>,
    last_live_tick: Option<u64>,
    last_mode: SimMode,
    last_report: TickReport,
}

impl InteractionPipeline {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn register_hand(&mut self, hand: HandId) -> bool {
        if self.hands.contains_key(&hand) {
            return false;
        }
        self.hands.insert(hand, HandController::default());
        self.frames.insert(hand, HandFrame::default());
        true
    }

    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Policy changes take effect from the next tick.
    pub fn set_policy(&mut self, policy: InteractionPolicy) {
        self.config.policy = policy;
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn policy(&self) -> &InteractionPolicy {
        &self.config.policy
    }

    pub fn tuning(&self) -> &InteractionTuning {
        &self.config.tuning
    }

    pub fn hand(&self, hand: HandId) -> Option<&HandController> {
        self.hands.get(&hand)
    }

    pub fn hand_state(&self, hand: HandId) -> Option<&HandState> {
        self.hands.get(&hand).map(|controller| &controller.state)
    }

    pub fn hands(&self) -> impl Iterator<Item = (&HandId, &HandController)> {
        self.hands.iter()
    }

    pub fn frame(&self, hand: HandId) -> Option<&HandFrame> {
        self.frames.get(&hand)
    }

    pub fn pending_commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn events(&self) -> &InteractionEventBus {
        &self.events
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn collision(&self) -> &CollisionWorld {
        &self.collision
    }

    pub fn last_tick_order(&self) -> &[StageId] {
        &self.last_tick_order
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    pub fn run_tick(
        &mut self,
        tick: u64,
        dt: f32,
        mode: SimMode,
        inputs: &BTreeMap<HandId, HandInput>,
        world: &mut ObjectStore,
    ) -> TickReport {
        self.last_tick_order.clear();
        let skipped = TickReport {
            tick,
            ..TickReport::default()
        };

        if mode != SimMode::Live {
            if self.last_mode == SimMode::Live {
                let dropped = self.commands.len();
                self.commands.clear();
                for controller in self.hands.values_mut() {
                    controller.release_edges.reset();
                }
                info!(tick, mode = ?mode, dropped, "interaction_suspended");
            }
            self.last_mode = mode;
            self.last_report = skipped;
            return skipped;
        }
        if self.last_mode != SimMode::Live {
            // Rewound state is authoritative; earlier ticks are legal again.
            self.last_live_tick = None;
            info!(tick, "interaction_resumed");
        }
        self.last_mode = mode;

        if let Some(last) = self.last_live_tick.filter(|last| tick <= *last) {
            warn!(tick, last_live_tick = last, "interaction_tick_repeated");
            self.last_report = skipped;
            return skipped;
        }

        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!(tick, dt, "invalid_tick_delta");
            0.0
        };

        let mut stats = CommandApplyStats::default();
        let mut mutations = ApplyPendingStats::default();
        {
            let mut context = StageContext {
                tick,
                dt,
                config: &self.config,
                inputs,
                world,
                hands: &mut self.hands,
                frames: &mut self.frames,
                commands: &mut self.commands,
                collision: &mut self.collision,
                events: &mut self.events,
                diagnostics: &mut self.diagnostics,
                stats: &mut stats,
            };
            for stage_id in STAGE_ORDER {
                self.last_tick_order.push(stage_id);
                run_stage(stage_id, &mut context);
                mutations.accumulate(context.world.apply_pending());
            }
        }

        self.events.finish_tick_rollover();
        self.last_live_tick = Some(tick);
        let report = TickReport {
            tick,
            ran: true,
            commands: stats,
            events: self.events.last_tick_counts(),
            mutations,
            despawned: mutations.despawned,
        };
        debug!(
            tick,
            consumed = stats.consumed.total,
            rejected = stats.rejected.total,
            unresolved = stats.unresolved.total,
            pruned = stats.pruned,
            events = report.events.total,
            "interaction_tick"
        );
        self.last_report = report;
        report
    }
}

fn run_stage(stage_id: StageId, context: &mut StageContext<'_>) {
    match stage_id {
        StageId::Housekeeping => run_housekeeping(context),
        StageId::Hover => hover::run(context),
        StageId::Affordance => affordance::run(context),
        StageId::Pickup => pickup::run(context),
        StageId::Hold => hold::run(context),
        StageId::QueueThrow => queue::run_queue_throw(context),
        StageId::QueueRelease => queue::run_queue_release(context),
        StageId::Throw => throw::run_throw(context),
        StageId::Slingshot => throw::run_slingshot(context),
        StageId::Gravity => gravity::run(context),
        StageId::Transform => transform::run(context),
        StageId::CollisionRebuild => context.collision.rebuild(&*context.world),
        StageId::Sweep => sweep::run(context),
    }
}

fn run_housekeeping(context: &mut StageContext<'_>) {
    let pruned = context.commands.prune_stale(context.tick);
    context.stats.pruned = context.stats.pruned.saturating_add(pruned);
    if pruned > 0 {
        debug!(tick = context.tick, pruned, "stale_commands_pruned");
    }

    let impacted: Vec<_> = context
        .world
        .objects()
        .iter()
        .filter(|object| object.impacted)
        .map(|object| object.id)
        .collect();
    for id in impacted {
        context.world.despawn(id);
        info!(tick = context.tick, object = id.0, "impacted_object_despawned");
    }

    let cooldown_seconds = context.config.tuning.cooldown_seconds;
    for (hand_id, controller) in context.hands.iter_mut() {
        let state = &mut controller.state;
        state.state_timer += context.dt;
        match state.current_state {
            HandPhase::Cooldown if state.state_timer >= cooldown_seconds => {
                state.transition(HandPhase::Idle);
            }
            HandPhase::Holding => {
                let still_held = state.held_object.is_some_and(|object| {
                    context
                        .world
                        .find(object)
                        .is_some_and(|object| object.held_by == Some(*hand_id) && !object.impacted)
                });
                if !still_held {
                    info!(
                        tick = context.tick,
                        hand = hand_id.0,
                        object = ?state.held_object.map(|id| id.0),
                        "held_object_lost"
                    );
                    state.transition(HandPhase::Idle);
                }
            }
            _ => {}
        }
    }
}
