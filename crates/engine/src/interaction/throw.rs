use std::collections::BTreeSet;

use glam::Vec3;
use tracing::{debug, info};

use super::command::{Command, CommandKind};
use super::config::InteractionTuning;
use super::diagnostics::DiagnosticKind;
use super::events::{InteractionEvent, ReleaseKind};
use super::hand::HandPhase;
use super::pipeline::StageContext;
use crate::world::{InFlightState, MarkerMutation, ObjectId};

pub fn throw_velocity(direction: Vec3, speed: f32) -> Vec3 {
    direction.normalize_or(Vec3::Y) * speed
}

/// Explicit positive speed wins; otherwise the charge level picks a speed
/// between the slingshot bounds.
pub fn slingshot_speed(speed: f32, charge_level: f32, tuning: &InteractionTuning) -> f32 {
    if speed > 0.0 {
        return speed;
    }
    let charge = if charge_level.is_finite() {
        charge_level.clamp(0.0, 1.0)
    } else {
        0.0
    };
    tuning.slingshot_min_speed + (tuning.slingshot_max_speed - tuning.slingshot_min_speed) * charge
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseStyle {
    Throw,
    Slingshot,
}

impl ReleaseStyle {
    fn command_kind(self) -> CommandKind {
        match self {
            Self::Throw => CommandKind::Throw,
            Self::Slingshot => CommandKind::SlingshotThrow,
        }
    }
}

pub(crate) fn run_throw(ctx: &mut StageContext<'_>) {
    run_release(ctx, ReleaseStyle::Throw);
}

pub(crate) fn run_slingshot(ctx: &mut StageContext<'_>) {
    run_release(ctx, ReleaseStyle::Slingshot);
}

fn run_release(ctx: &mut StageContext<'_>, style: ReleaseStyle) {
    let kind = style.command_kind();
    let commands = ctx.commands.take_for(ctx.tick, kind);
    // Held and staged markers only clear after the stage, so repeats are caught here.
    let mut released = BTreeSet::new();
    for command in commands {
        match release(ctx, &command, style, &released) {
            Some(object) => {
                released.insert(object);
                ctx.stats.record_consumed(kind);
            }
            None => {
                ctx.stats.record_rejected(kind);
                debug!(
                    tick = ctx.tick,
                    hand = command.hand.0,
                    target = ?command.target.map(|id| id.0),
                    kind = ?kind,
                    "release_ignored"
                );
            }
        }
    }
}

fn release(
    ctx: &mut StageContext<'_>,
    command: &Command,
    style: ReleaseStyle,
    released: &BTreeSet<ObjectId>,
) -> Option<ObjectId> {
    let target = command.target?;
    if released.contains(&target) {
        return None;
    }
    let policy = ctx.config.policy;
    let tuning = ctx.config.tuning;
    let object = ctx.world.find_mut(target)?;
    let owned = object.held_by == Some(command.hand) || object.staged_by == Some(command.hand);
    if !owned {
        return None;
    }

    let speed = match style {
        ReleaseStyle::Throw => command.speed,
        ReleaseStyle::Slingshot => slingshot_speed(command.speed, command.charge_level, &tuning),
    };
    let pose = object.pose;

    let (release_kind, velocity) = match object.body.as_mut() {
        None => {
            ctx.diagnostics.report_once(
                target,
                DiagnosticKind::MissingVelocity,
                policy.missing_component_mode,
            );
            (ReleaseKind::Drop, Vec3::ZERO)
        }
        Some(body) => {
            let velocity = throw_velocity(command.direction, speed);
            body.linear = velocity;
            body.gravity_factor = match (body.gravity_factor, style) {
                (Some(factor), _) => Some(factor.max(1.0)),
                (None, ReleaseStyle::Throw) => Some(1.0),
                (None, ReleaseStyle::Slingshot) => {
                    ctx.diagnostics.report_once(
                        target,
                        DiagnosticKind::MissingGravityFactor,
                        policy.missing_component_mode,
                    );
                    if policy.is_strict() {
                        None
                    } else {
                        Some(1.0)
                    }
                }
            };
            let kind = match style {
                ReleaseStyle::Throw => ReleaseKind::Throw,
                ReleaseStyle::Slingshot => ReleaseKind::Slingshot,
            };
            (kind, velocity)
        }
    };

    ctx.world.defer(MarkerMutation::DetachHeld { object: target });
    ctx.world.defer(MarkerMutation::SetStaged {
        object: target,
        hand: None,
    });
    ctx.world.defer(MarkerMutation::SetSuppressed {
        object: target,
        enabled: false,
    });
    if release_kind == ReleaseKind::Drop {
        ctx.world.defer(MarkerMutation::EndFlight { object: target });
    } else {
        ctx.world.defer(MarkerMutation::BeginFlight {
            object: target,
            state: InFlightState::released_from(pose, velocity),
        });
    }

    if let Some(controller) = ctx.hands.get_mut(&command.hand) {
        controller.queue.remove_target(target);
        if controller.state.is_holding(target) {
            controller.state.transition(HandPhase::Cooldown);
        }
    }

    ctx.events.emit(InteractionEvent::Released {
        hand: command.hand,
        object: target,
        kind: release_kind,
        velocity,
    });
    info!(
        tick = ctx.tick,
        hand = command.hand.0,
        object = target.0,
        kind = ?release_kind,
        speed = velocity.length(),
        "throw_released"
    );
    Some(target)
}
