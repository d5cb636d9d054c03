use std::collections::BTreeSet;

use glam::Vec3;
use tracing::{debug, info};

use super::command::{Command, CommandKind};
use super::events::{InteractionEvent, ReleaseKind};
use super::hand::{HandPhase, ThrowQueueEntry};
use super::pipeline::StageContext;
use crate::world::{MarkerMutation, ObjectId};

/// Moves held objects into their hand's throw queue without launching them.
pub(crate) fn run_queue_throw(ctx: &mut StageContext<'_>) {
    let commands = ctx.commands.take_for(ctx.tick, CommandKind::QueueThrow);
    let mut staged = BTreeSet::new();
    for command in commands {
        match stage(ctx, &command, &staged) {
            Some(object) => {
                staged.insert(object);
                ctx.stats.record_consumed(CommandKind::QueueThrow);
            }
            None => {
                ctx.stats.record_rejected(CommandKind::QueueThrow);
                debug!(
                    tick = ctx.tick,
                    hand = command.hand.0,
                    target = ?command.target.map(|id| id.0),
                    "queue_throw_rejected"
                );
            }
        }
    }
}

fn stage(
    ctx: &mut StageContext<'_>,
    command: &Command,
    staged: &BTreeSet<ObjectId>,
) -> Option<ObjectId> {
    let target = command.target?;
    if staged.contains(&target) {
        return None;
    }
    let object = ctx.world.find(target)?;
    if object.held_by != Some(command.hand) {
        return None;
    }
    let controller = ctx.hands.get_mut(&command.hand)?;

    controller.queue.push(ThrowQueueEntry {
        target,
        direction: command.direction,
        force: command.speed,
    });
    if controller.state.is_holding(target) {
        controller.state.transition(HandPhase::Idle);
    }

    ctx.world.defer(MarkerMutation::DetachHeld { object: target });
    ctx.world.defer(MarkerMutation::SetSuppressed {
        object: target,
        enabled: false,
    });
    ctx.world.defer(MarkerMutation::SetStaged {
        object: target,
        hand: Some(command.hand),
    });
    ctx.events.emit(InteractionEvent::Released {
        hand: command.hand,
        object: target,
        kind: ReleaseKind::Staged,
        velocity: Vec3::ZERO,
    });
    Some(target)
}

/// Polls each hand's release edges and turns queued entries into `Throw`
/// commands stamped with the current tick.
pub(crate) fn run_queue_release(ctx: &mut StageContext<'_>) {
    for (hand_id, controller) in ctx.hands.iter_mut() {
        let Some(input) = ctx.inputs.get(hand_id) else {
            continue;
        };
        let trigger = controller.release_edges.poll(input);
        let entries = if trigger.release_all {
            controller.queue.drain_all()
        } else if trigger.release_one {
            controller.queue.pop_front().into_iter().collect()
        } else {
            continue;
        };

        let mut emitted = 0u32;
        for entry in entries {
            if ctx.world.find(entry.target).is_none() {
                debug!(
                    tick = ctx.tick,
                    hand = hand_id.0,
                    object = entry.target.0,
                    "queued_target_missing"
                );
                continue;
            }
            ctx.commands.push(Command::throw(
                ctx.tick,
                *hand_id,
                entry.target,
                entry.direction,
                entry.force,
            ));
            emitted = emitted.saturating_add(1);
        }
        ctx.stats.emitted_throws = ctx.stats.emitted_throws.saturating_add(emitted);
        info!(
            tick = ctx.tick,
            hand = hand_id.0,
            release_all = trigger.release_all,
            emitted,
            remaining = controller.queue.len(),
            "throw_queue_released"
        );
    }
}
