use std::collections::BTreeSet;

use tracing::{debug, info};

use super::affordance::pickup_eligible;
use super::command::{Command, CommandKind};
use super::diagnostics::DiagnosticKind;
use super::events::InteractionEvent;
use super::hand::HandPhase;
use super::pipeline::StageContext;
use crate::world::{MarkerMutation, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupRejection {
    MissingTarget,
    UnknownHand,
    HandBusy,
    AlreadyHeld,
    NeverPickable,
    Ineligible,
    MissingSuppressionMarker,
}

impl PickupRejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingTarget => "missing_target",
            Self::UnknownHand => "unknown_hand",
            Self::HandBusy => "hand_busy",
            Self::AlreadyHeld => "already_held",
            Self::NeverPickable => "never_pickable",
            Self::Ineligible => "ineligible",
            Self::MissingSuppressionMarker => "missing_suppression_marker",
        }
    }
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    let commands = ctx.commands.take_for(ctx.tick, CommandKind::Pick);
    // First claim wins within a pass; markers are only applied after the stage.
    let mut claimed = BTreeSet::new();
    for command in commands {
        match try_pickup(ctx, &command, &mut claimed) {
            Ok(object) => {
                ctx.stats.record_consumed(CommandKind::Pick);
                info!(
                    tick = ctx.tick,
                    hand = command.hand.0,
                    object = object.0,
                    "object_picked"
                );
            }
            Err(reason) => {
                ctx.stats.record_rejected(CommandKind::Pick);
                debug!(
                    tick = ctx.tick,
                    hand = command.hand.0,
                    target = ?command.target.map(|id| id.0),
                    reason = reason.as_str(),
                    "pickup_rejected"
                );
            }
        }
    }
}

fn try_pickup(
    ctx: &mut StageContext<'_>,
    command: &Command,
    claimed: &mut BTreeSet<ObjectId>,
) -> Result<ObjectId, PickupRejection> {
    let target = command.target.ok_or(PickupRejection::MissingTarget)?;
    let hand_phase = ctx
        .hands
        .get(&command.hand)
        .map(|controller| controller.state.current_state)
        .ok_or(PickupRejection::UnknownHand)?;
    if hand_phase != HandPhase::Idle {
        return Err(PickupRejection::HandBusy);
    }

    let object = ctx
        .world
        .find(target)
        .ok_or(PickupRejection::MissingTarget)?;
    if object.held_by.is_some() || claimed.contains(&target) {
        return Err(PickupRejection::AlreadyHeld);
    }
    if object.tags.never_pickable {
        return Err(PickupRejection::NeverPickable);
    }
    let modifier = ctx
        .inputs
        .get(&command.hand)
        .is_some_and(|input| input.world_grab_modifier());
    if !pickup_eligible(object, &ctx.config.policy, modifier) {
        return Err(PickupRejection::Ineligible);
    }

    if object.movement_suppressed.is_none() {
        let mode = ctx.config.policy.missing_component_mode;
        ctx.diagnostics
            .report_once(target, DiagnosticKind::MissingSuppressionMarker, mode);
        if ctx.config.policy.is_strict() {
            return Err(PickupRejection::MissingSuppressionMarker);
        }
    }

    let hold_distance = command.target_position.distance(object.pose.position);

    if let Some(body) = ctx
        .world
        .find_mut(target)
        .and_then(|object| object.body.as_mut())
    {
        body.zero_velocity();
    }
    ctx.world.defer(MarkerMutation::AttachHeld {
        object: target,
        hand: command.hand,
    });
    ctx.world.defer(MarkerMutation::SetSuppressed {
        object: target,
        enabled: true,
    });
    ctx.world.defer(MarkerMutation::SetStaged {
        object: target,
        hand: None,
    });
    ctx.world.defer(MarkerMutation::EndFlight { object: target });

    for controller in ctx.hands.values_mut() {
        controller.queue.remove_target(target);
    }
    if let Some(controller) = ctx.hands.get_mut(&command.hand) {
        controller
            .state
            .begin_holding(target, command.target_position, hold_distance);
    }

    claimed.insert(target);
    ctx.events.emit(InteractionEvent::Picked {
        hand: command.hand,
        object: target,
    });
    Ok(target)
}
