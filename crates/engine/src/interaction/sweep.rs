use glam::Vec3;
use tracing::info;

use super::diagnostics::DiagnosticKind;
use super::events::{ImpactEvent, InteractionEvent};
use super::pipeline::StageContext;
use crate::world::{MarkerMutation, ObjectId, WorldQuery};

#[derive(Debug, Clone, Copy)]
struct PendingImpact {
    object: ObjectId,
    other: ObjectId,
    point: Vec3,
    normal: Vec3,
    impact_triggered: bool,
}

/// Where a mover stops along `from -> to` after hitting at `fraction`, backed
/// off by `pullback` but never behind its starting point.
pub fn impact_point(from: Vec3, to: Vec3, fraction: f32, pullback: f32) -> Vec3 {
    let travel = to - from;
    let length = travel.length();
    let contact = from + travel * fraction;
    if length <= f32::EPSILON {
        return contact;
    }
    let back_off = pullback.min(fraction * length);
    contact - travel / length * back_off
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    let threshold = ctx.config.tuning.sweep_speed_threshold;
    let pullback = ctx.config.tuning.sweep_pullback;

    let mode = ctx.config.policy.missing_component_mode;

    let mut impacts = Vec::new();
    for object in ctx.world.objects() {
        let (Some(flight), Some(body)) = (object.in_flight, object.body) else {
            continue;
        };
        if !body.is_kinematic() {
            continue;
        }
        let Some(shape) = object.collider else {
            ctx.diagnostics
                .report_once(object.id, DiagnosticKind::MissingCollider, mode);
            continue;
        };
        if body.linear.length() <= threshold {
            continue;
        }
        let Some(hit) = ctx.collision.sweep_shape(
            &shape,
            flight.prev_rotation,
            flight.prev_position,
            object.pose.position,
            Some(object.id),
        ) else {
            continue;
        };
        impacts.push(PendingImpact {
            object: object.id,
            other: hit.object,
            point: impact_point(flight.prev_position, object.pose.position, hit.fraction, pullback),
            normal: hit.normal,
            impact_triggered: object.tags.impact_triggered,
        });
    }

    for impact in impacts {
        if let Some(object) = ctx.world.find_mut(impact.object) {
            object.pose.position = impact.point;
            if let Some(body) = object.body.as_mut() {
                body.zero_velocity();
            }
        }
        ctx.world.defer(MarkerMutation::EndFlight {
            object: impact.object,
        });
        if impact.impact_triggered {
            ctx.world.defer(MarkerMutation::MarkImpacted {
                object: impact.object,
            });
        }
        ctx.events.emit(InteractionEvent::Impact(ImpactEvent {
            object: impact.object,
            other: impact.other,
            point: impact.point,
            normal: impact.normal,
            tick: ctx.tick,
        }));
        info!(
            tick = ctx.tick,
            object = impact.object.0,
            other = impact.other.0,
            x = impact.point.x,
            y = impact.point.y,
            z = impact.point.z,
            impact_triggered = impact.impact_triggered,
            "sweep_impact"
        );
    }
}
