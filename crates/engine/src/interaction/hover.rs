use super::pipeline::StageContext;
use crate::world::{ObjectId, Ray, RayHit, WorldQuery};

/// Nearest object along `ray`; equal distances resolve to the lower id.
pub fn resolve_hover<Q: WorldQuery + ?Sized>(
    query: &Q,
    ray: Ray,
    max_distance: f32,
    ignore: Option<ObjectId>,
) -> Option<RayHit> {
    query.ray_cast(ray, max_distance, ignore)
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    // Hover sees poses as the host left them between ticks.
    ctx.collision.rebuild(&*ctx.world);

    let max_distance = ctx.config.tuning.hover_max_distance;
    for (hand_id, controller) in ctx.hands.iter() {
        let hover = ctx
            .inputs
            .get(hand_id)
            .and_then(|input| input.hover_ray)
            .and_then(|ray| {
                resolve_hover(
                    &*ctx.collision,
                    ray,
                    max_distance,
                    controller.state.held_object,
                )
            });
        let frame = ctx.frames.entry(*hand_id).or_default();
        frame.hover = hover;
    }
}
