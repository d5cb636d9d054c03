use serde::Serialize;

use super::config::InteractionPolicy;
use super::pipeline::StageContext;
use crate::world::SimObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    PickUp,
    Siphon,
    DumpStorehouse,
    DumpConstruction,
    DumpGround,
    Cast,
}

impl Affordance {
    const fn bit(self) -> u8 {
        match self {
            Affordance::PickUp => 1 << 0,
            Affordance::Siphon => 1 << 1,
            Affordance::DumpStorehouse => 1 << 2,
            Affordance::DumpConstruction => 1 << 3,
            Affordance::DumpGround => 1 << 4,
            Affordance::Cast => 1 << 5,
        }
    }
}

/// Legal actions on the hovered object. Recomputed every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AffordanceSet {
    bits: u8,
    pub resource_type: Option<u16>,
}

impl AffordanceSet {
    pub fn contains(&self, affordance: Affordance) -> bool {
        self.bits & affordance.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    fn set(&mut self, affordance: Affordance, enabled: bool) {
        if enabled {
            self.bits |= affordance.bit();
        } else {
            self.bits &= !affordance.bit();
        }
    }
}

pub fn resolve_affordances(
    object: Option<&SimObject>,
    policy: &InteractionPolicy,
    world_grab_modifier: bool,
) -> AffordanceSet {
    let mut set = AffordanceSet::default();
    let Some(object) = object else {
        return set;
    };
    let tags = &object.tags;

    set.set(
        Affordance::PickUp,
        can_pick_up(object, policy, world_grab_modifier),
    );
    if let Some(resource) = tags.siphon_resource {
        set.set(Affordance::Siphon, true);
        set.resource_type = Some(resource);
    }
    set.set(Affordance::DumpStorehouse, tags.dump_storehouse);
    set.set(Affordance::DumpConstruction, tags.dump_construction);
    set.set(Affordance::DumpGround, tags.dump_ground);
    set.set(Affordance::Cast, tags.castable_surface);
    set
}

/// The hover-time pick rule, which always honors `auto_pick_dynamic`.
pub fn can_pick_up(object: &SimObject, policy: &InteractionPolicy, world_grab_modifier: bool) -> bool {
    pick_rule(object, policy, world_grab_modifier, true)
}

/// The rule the pickup stage applies. `auto_pick_dynamic` only counts here
/// when `auto_pick_in_pickup` is also set, so the two rules can disagree.
pub fn pickup_eligible(
    object: &SimObject,
    policy: &InteractionPolicy,
    world_grab_modifier: bool,
) -> bool {
    pick_rule(object, policy, world_grab_modifier, policy.auto_pick_in_pickup)
}

/// World-grab permission independent of the modifier key; hold-follow uses
/// this once an object is already in hand.
pub fn world_grab_permitted(object: &SimObject, policy: &InteractionPolicy) -> bool {
    policy.world_grab_enabled && (object.tags.manipulable || policy.world_grab_any_target)
}

fn pick_rule(
    object: &SimObject,
    policy: &InteractionPolicy,
    world_grab_modifier: bool,
    honor_auto_pick: bool,
) -> bool {
    if object.tags.never_pickable {
        return false;
    }
    object.tags.pickable
        || (honor_auto_pick && policy.auto_pick_dynamic && object.body.is_some())
        || (world_grab_modifier && world_grab_permitted(object, policy))
}

pub(crate) fn run(ctx: &mut StageContext<'_>) {
    for (hand_id, frame) in ctx.frames.iter_mut() {
        let hovered = frame
            .hover
            .and_then(|hit| ctx.world.find(hit.object));
        let modifier = ctx
            .inputs
            .get(hand_id)
            .is_some_and(|input| input.world_grab_modifier());
        frame.affordances = resolve_affordances(hovered, &ctx.config.policy, modifier);
    }
}
