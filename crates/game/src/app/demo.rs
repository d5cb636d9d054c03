use std::collections::VecDeque;

use glam::Vec3;
use interaction_engine::{
    CapabilityTags, Command, HandAction, HandId, HandInput, HandInputRecord, HandPhase,
    InteractionConfig, InteractionPipeline, InteractionPolicy, ObjectDesc, ObjectId, ObjectStore,
    PhysicsBody, Ray, Shape, SimMode, TickRecord,
};
use tracing::{debug, info};

use super::loop_runner::TickSource;

pub(crate) const DEMO_HAND: HandId = HandId(0);
const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 3.0, -10.0);
const GRAB_OFFSET: Vec3 = Vec3::new(0.0, 0.5, 0.0);

#[derive(Debug, Clone, Copy)]
pub(crate) struct DemoObjects {
    pub(crate) crate_box: ObjectId,
    pub(crate) dart: ObjectId,
    pub(crate) stone: ObjectId,
    pub(crate) pebble: ObjectId,
    pub(crate) lever: ObjectId,
    pub(crate) wall: ObjectId,
}

/// World-grab is on so the lever can be moved; everything else is default.
pub(crate) fn demo_config() -> InteractionConfig {
    InteractionConfig {
        policy: InteractionPolicy {
            world_grab_enabled: true,
            ..InteractionPolicy::default()
        },
        ..InteractionConfig::default()
    }
}

pub(crate) fn build_demo_world(world: &mut ObjectStore) -> DemoObjects {
    let pickable = CapabilityTags {
        pickable: true,
        ..CapabilityTags::default()
    };

    let crate_box = world.spawn(
        ObjectDesc::new("crate", Vec3::new(0.0, 1.0, 0.0))
            .with_body(PhysicsBody::dynamic(2.0))
            .with_collider(Shape::Box {
                half_extents: Vec3::splat(0.3),
            })
            .with_tags(pickable)
            .with_follow_factor(0.8)
            // Resting until picked; the host has no ground contact.
            .with_suppression_marker(true),
    );
    let dart = world.spawn(
        ObjectDesc::new("dart", Vec3::new(-1.0, 1.0, 0.0))
            .with_body(PhysicsBody::kinematic())
            .with_collider(Shape::Capsule {
                radius: 0.05,
                half_height: 0.2,
            })
            .with_tags(CapabilityTags {
                impact_triggered: true,
                ..pickable
            })
            .with_fallback_mass(0.5)
            .with_suppression_marker(false),
    );
    let stone = world.spawn(
        ObjectDesc::new("stone", Vec3::new(1.0, 1.0, 0.0))
            .with_body(PhysicsBody::kinematic().with_gravity_factor(1.5))
            .with_collider(Shape::Sphere { radius: 0.2 })
            .with_tags(pickable)
            .with_suppression_marker(false),
    );
    let pebble = world.spawn(
        ObjectDesc::new("pebble", Vec3::new(2.0, 1.0, 0.0))
            .with_body(PhysicsBody::kinematic())
            .with_collider(Shape::Sphere { radius: 0.15 })
            .with_tags(pickable)
            .with_suppression_marker(false),
    );
    let lever = world.spawn(
        ObjectDesc::new("lever", Vec3::new(3.0, 1.0, 0.0))
            .with_collider(Shape::Box {
                half_extents: Vec3::new(0.1, 0.4, 0.1),
            })
            .with_tags(CapabilityTags {
                manipulable: true,
                ..CapabilityTags::default()
            })
            .with_follow_factor(0.3)
            .with_suppression_marker(false),
    );
    let wall = world.spawn(
        ObjectDesc::new("wall", Vec3::new(12.0, 2.0, 0.0)).with_collider(Shape::Box {
            half_extents: Vec3::new(0.5, 4.0, 4.0),
        }),
    );
    world.spawn(
        ObjectDesc::new("floor", Vec3::new(0.0, -0.5, 0.0)).with_collider(Shape::Box {
            half_extents: Vec3::new(20.0, 0.5, 20.0),
        }),
    );
    world.apply_pending();

    DemoObjects {
        crate_box,
        dart,
        stone,
        pebble,
        lever,
        wall,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Beat {
    Pick { object: ObjectId, world_grab: bool },
    Hold { object: ObjectId, point: Vec3, ticks: u32 },
    Throw { object: ObjectId, direction: Vec3, speed: f32 },
    Slingshot { object: ObjectId, direction: Vec3, charge: f32 },
    QueueThrow { object: ObjectId, direction: Vec3, force: f32 },
    ReleaseAll,
    Wait { ticks: u32 },
}

impl Beat {
    fn focus(&self) -> Option<ObjectId> {
        match *self {
            Beat::Pick { object, .. }
            | Beat::Hold { object, .. }
            | Beat::Throw { object, .. }
            | Beat::Slingshot { object, .. }
            | Beat::QueueThrow { object, .. } => Some(object),
            Beat::ReleaseAll | Beat::Wait { .. } => None,
        }
    }
}

fn demo_script(objects: &DemoObjects) -> VecDeque<Beat> {
    VecDeque::from([
        Beat::Pick {
            object: objects.crate_box,
            world_grab: false,
        },
        Beat::Hold {
            object: objects.crate_box,
            point: Vec3::new(0.0, 2.5, -1.0),
            ticks: 90,
        },
        Beat::Throw {
            object: objects.crate_box,
            direction: Vec3::new(0.0, 1.0, 1.0),
            speed: 6.0,
        },
        Beat::Pick {
            object: objects.dart,
            world_grab: false,
        },
        Beat::Hold {
            object: objects.dart,
            point: Vec3::new(-1.0, 2.0, 0.0),
            ticks: 30,
        },
        Beat::Slingshot {
            object: objects.dart,
            direction: Vec3::X,
            charge: 0.8,
        },
        Beat::Wait { ticks: 30 },
        Beat::Pick {
            object: objects.stone,
            world_grab: false,
        },
        Beat::QueueThrow {
            object: objects.stone,
            direction: Vec3::new(1.0, 0.3, 0.0),
            force: 15.0,
        },
        Beat::Pick {
            object: objects.pebble,
            world_grab: false,
        },
        Beat::QueueThrow {
            object: objects.pebble,
            direction: Vec3::new(1.0, 0.5, 0.0),
            force: 18.0,
        },
        Beat::Wait { ticks: 10 },
        Beat::ReleaseAll,
        Beat::Wait { ticks: 60 },
        Beat::Pick {
            object: objects.lever,
            world_grab: true,
        },
        Beat::Hold {
            object: objects.lever,
            point: Vec3::new(3.0, 2.0, 0.0),
            ticks: 40,
        },
        Beat::Throw {
            object: objects.lever,
            direction: Vec3::Z,
            speed: 1.0,
        },
        Beat::Wait { ticks: 60 },
    ])
}

/// Scripted decision logic standing in for a player: walks a fixed list of
/// beats and turns each into hand input plus tick-stamped commands.
#[derive(Debug)]
pub(crate) struct DemoDirector {
    beats: VecDeque<Beat>,
    beat_ticks: u32,
    sample_id: u64,
}

impl DemoDirector {
    pub(crate) fn new(objects: &DemoObjects) -> Self {
        Self {
            beats: demo_script(objects),
            beat_ticks: 0,
            sample_id: 0,
        }
    }

    fn advance(&mut self, tick: u64) {
        if let Some(beat) = self.beats.pop_front() {
            debug!(tick, ?beat, "demo_beat_done");
        }
        self.beat_ticks = 0;
    }
}

impl TickSource for DemoDirector {
    fn next_record(
        &mut self,
        tick: u64,
        world: &ObjectStore,
        pipeline: &InteractionPipeline,
    ) -> Option<TickRecord> {
        let Some(beat) = self.beats.front().copied() else {
            info!(tick, "demo_script_finished");
            return None;
        };
        self.sample_id = self.sample_id.saturating_add(1);
        let hand_phase = pipeline
            .hand_state(DEMO_HAND)
            .map(|state| state.current_state)
            .unwrap_or_default();
        let holding = |object| {
            pipeline
                .hand_state(DEMO_HAND)
                .is_some_and(|state| state.is_holding(object))
        };

        let mut input = HandInput::new(self.sample_id);
        if let Some(target) = beat.focus().and_then(|object| world.find(object)) {
            let direction = target.pose.position - CAMERA_POSITION;
            input = input.with_hover_ray(Ray::new(CAMERA_POSITION, direction));
        }
        let mut commands = Vec::new();

        match beat {
            Beat::Pick { object, world_grab } => {
                input = input.with_action(HandAction::WorldGrabModifier, world_grab);
                match world.find(object) {
                    None => self.advance(tick),
                    Some(_) if hand_phase != HandPhase::Idle => {}
                    Some(target) => {
                        let grab_point = target.pose.position + GRAB_OFFSET;
                        commands.push(Command::pick(tick, DEMO_HAND, object, grab_point));
                        self.advance(tick);
                    }
                }
            }
            Beat::Hold {
                object,
                point,
                ticks,
            } => {
                if holding(object) && self.beat_ticks < ticks {
                    commands.push(Command::hold(tick, DEMO_HAND, object, point));
                    self.beat_ticks += 1;
                } else {
                    self.advance(tick);
                }
            }
            Beat::Throw {
                object,
                direction,
                speed,
            } => {
                commands.push(Command::throw(tick, DEMO_HAND, object, direction, speed));
                self.advance(tick);
            }
            Beat::Slingshot {
                object,
                direction,
                charge,
            } => {
                commands.push(Command::slingshot(
                    tick, DEMO_HAND, object, direction, 0.0, charge,
                ));
                self.advance(tick);
            }
            Beat::QueueThrow {
                object,
                direction,
                force,
            } => {
                commands.push(Command::queue_throw(tick, DEMO_HAND, object, direction, force));
                self.advance(tick);
            }
            Beat::ReleaseAll => {
                input = input.with_action(HandAction::ReleaseAll, true);
                self.advance(tick);
            }
            Beat::Wait { ticks } => {
                self.beat_ticks += 1;
                if self.beat_ticks >= ticks {
                    self.advance(tick);
                }
            }
        }

        Some(TickRecord {
            tick,
            mode: SimMode::Live,
            inputs: vec![HandInputRecord {
                hand: DEMO_HAND,
                input,
            }],
            commands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_world_spawns_every_prop() {
        let mut world = ObjectStore::default();
        let objects = build_demo_world(&mut world);

        assert_eq!(world.len(), 7);
        assert!(world.find(objects.wall).is_some());
        assert!(world.find(objects.crate_box).expect("crate").is_movement_suppressed());
        assert!(world.find(objects.dart).expect("dart").tags.impact_triggered);
    }

    #[test]
    fn first_beat_picks_the_crate() {
        let mut world = ObjectStore::default();
        let objects = build_demo_world(&mut world);
        let mut director = DemoDirector::new(&objects);
        let mut pipeline = InteractionPipeline::new(demo_config());
        pipeline.register_hand(DEMO_HAND);

        let record = director
            .next_record(0, &world, &pipeline)
            .expect("first beat");
        assert_eq!(record.commands.len(), 1);
        assert_eq!(record.commands[0].target, Some(objects.crate_box));
        let input = record.inputs[0].input;
        assert!(input.hover_ray.is_some());
        assert!(!input.world_grab_modifier());
    }

    #[test]
    fn hold_beat_is_skipped_when_the_pick_failed() {
        let mut world = ObjectStore::default();
        let objects = build_demo_world(&mut world);
        let mut director = DemoDirector::new(&objects);
        let pipeline = InteractionPipeline::new(demo_config());

        // No registered hand, so the hold beat finds nothing in hand.
        director.next_record(0, &world, &pipeline);
        let record = director.next_record(1, &world, &pipeline).expect("hold beat");
        assert!(record.commands.is_empty());
        let record = director.next_record(2, &world, &pipeline).expect("throw beat");
        assert_eq!(record.commands[0].kind, interaction_engine::CommandKind::Throw);
    }
}
