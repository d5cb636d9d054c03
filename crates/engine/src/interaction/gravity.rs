use super::pipeline::StageContext;

/// A missing or non-positive factor means "use 1"; zero does not disable gravity.
pub fn effective_gravity_factor(factor: Option<f32>) -> f32 {
    match factor {
        Some(value) if value > 0.0 => value,
        _ => 1.0,
    }
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    let gravity = ctx.config.tuning.gravity;
    for object in ctx.world.objects_mut() {
        let Some(flight) = object.in_flight.as_mut() else {
            continue;
        };
        // Dynamic bodies get gravity from the host engine.
        if let Some(body) = object.body.as_mut().filter(|body| body.is_kinematic()) {
            body.linear += gravity * effective_gravity_factor(body.gravity_factor) * ctx.dt;
        }
        flight.time_since_release += ctx.dt;
    }
}
