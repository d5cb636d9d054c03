use glam::Vec3;
use tracing::debug;

use super::affordance::world_grab_permitted;
use super::command::{Command, CommandKind};
use super::pipeline::StageContext;

const MIN_FALLBACK_MASS: f32 = 1e-3;

/// One critically damped spring step toward `target`. Only velocity changes;
/// position is integrated by whoever owns the body.
pub fn spring_follow_velocity(
    position: Vec3,
    velocity: Vec3,
    target: Vec3,
    stiffness: f32,
    mass: f32,
    dt: f32,
) -> Vec3 {
    let damping = 2.0 * (stiffness * mass).sqrt();
    let displacement = target - position;
    let acceleration = (displacement * stiffness - velocity * damping) / mass;
    velocity + acceleration * dt
}

/// Mass used by the spring: from inverse mass (floored at `min_inv_mass`) for
/// dynamic bodies, else the per-object fallback.
pub fn effective_mass(inv_mass: f32, min_inv_mass: f32, fallback_mass: f32) -> f32 {
    if inv_mass > 0.0 {
        1.0 / inv_mass.max(min_inv_mass)
    } else {
        fallback_mass.max(MIN_FALLBACK_MASS)
    }
}

pub fn clamp_follow_factor(follow_factor: f32, min_follow_factor: f32) -> f32 {
    if follow_factor.is_finite() {
        follow_factor.clamp(min_follow_factor, 1.0)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldOutcome {
    Spring,
    WorldGrab,
    Unresolved(&'static str),
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    let commands = ctx.commands.take_for(ctx.tick, CommandKind::Hold);
    let mut unresolved = Vec::new();
    for command in commands {
        match apply_hold(ctx, &command) {
            HoldOutcome::Spring | HoldOutcome::WorldGrab => {
                ctx.stats.record_consumed(CommandKind::Hold);
                if let Some(controller) = ctx.hands.get_mut(&command.hand) {
                    controller.state.hold_point = command.target_position;
                }
            }
            HoldOutcome::Unresolved(reason) => {
                ctx.stats.record_unresolved(CommandKind::Hold);
                debug!(
                    tick = ctx.tick,
                    hand = command.hand.0,
                    target = ?command.target.map(|id| id.0),
                    reason,
                    "hold_unresolved"
                );
                unresolved.push(command);
            }
        }
    }
    ctx.commands.restore(unresolved);
}

fn apply_hold(ctx: &mut StageContext<'_>, command: &Command) -> HoldOutcome {
    let Some(target) = command.target else {
        return HoldOutcome::Unresolved("missing_target");
    };
    let holds_target = ctx
        .hands
        .get(&command.hand)
        .is_some_and(|controller| controller.state.is_holding(target));
    if !holds_target {
        return HoldOutcome::Unresolved("not_held_by_hand");
    }
    let tuning = ctx.config.tuning;
    let policy = ctx.config.policy;
    let Some(object) = ctx.world.find_mut(target) else {
        return HoldOutcome::Unresolved("missing_target");
    };
    if object.held_by != Some(command.hand) {
        return HoldOutcome::Unresolved("not_held_by_hand");
    }

    let follow_factor = clamp_follow_factor(object.hold.follow_factor, tuning.min_follow_factor);
    let world_grab = world_grab_permitted(object, &policy);
    let hold = object.hold;
    let position = object.pose.position;
    match object.body.as_mut() {
        Some(body) => {
            let mass = effective_mass(body.inv_mass, tuning.min_inv_mass, hold.fallback_mass);
            body.linear = spring_follow_velocity(
                position,
                body.linear,
                command.target_position,
                tuning.spring_stiffness * follow_factor,
                mass,
                ctx.dt,
            );
            HoldOutcome::Spring
        }
        None if world_grab => {
            object.pose.position = position.lerp(command.target_position, follow_factor);
            HoldOutcome::WorldGrab
        }
        None => HoldOutcome::Unresolved("world_grab_not_permitted"),
    }
}
