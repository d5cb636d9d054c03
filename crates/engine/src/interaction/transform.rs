use super::pipeline::StageContext;

/// Advances kinematic in-flight objects. The pose before the move is kept as
/// the sweep origin, except on the first flight tick where the release pose
/// already is.
pub(crate) fn run(ctx: &mut StageContext<'_>) {
    for object in ctx.world.objects_mut() {
        let Some(body) = object.body.filter(|body| body.is_kinematic()) else {
            continue;
        };
        let Some(flight) = object.in_flight.as_mut() else {
            continue;
        };
        if flight.fresh {
            flight.fresh = false;
        } else {
            flight.prev_position = object.pose.position;
            flight.prev_rotation = object.pose.rotation;
        }
        object.pose.advance(body.linear, body.angular, ctx.dt);
    }
}
