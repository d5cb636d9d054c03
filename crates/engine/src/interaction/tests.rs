    use std::collections::BTreeMap;

    use glam::Vec3;

    use super::*;
    use crate::app::{HandAction, HandInput};
    use crate::world::{
        CapabilityTags, HandId, HostStepper, ObjectDesc, ObjectId, ObjectStore, PhysicsBody, Ray,
        Shape, SimObject,
    };
    use crate::world_digest;

    const DT: f32 = 1.0 / 60.0;
    const HAND: HandId = HandId(0);

    struct Harness {
        pipeline: InteractionPipeline,
        world: ObjectStore,
        inputs: BTreeMap<HandId, HandInput>,
        host: Option<HostStepper>,
        tick: u64,
    }

    impl Harness {
        fn new(config: InteractionConfig) -> Self {
            let mut pipeline = InteractionPipeline::new(config);
            pipeline.register_hand(HAND);
            Self {
                pipeline,
                world: ObjectStore::default(),
                inputs: BTreeMap::new(),
                host: None,
                tick: 0,
            }
        }

        fn with_host(mut self) -> Self {
            self.host = Some(HostStepper::new(self.pipeline.tuning().gravity));
            self
        }

        fn spawn(&mut self, desc: ObjectDesc) -> ObjectId {
            let id = self.world.spawn(desc);
            self.world.apply_pending();
            id
        }

        fn step(&mut self) -> TickReport {
            let report =
                self.pipeline
                    .run_tick(self.tick, DT, SimMode::Live, &self.inputs, &mut self.world);
            if let Some(host) = self.host {
                host.step(&mut self.world, DT);
            }
            self.tick += 1;
            report
        }

        fn step_with(&mut self, commands: impl IntoIterator<Item = Command>) -> TickReport {
            for command in commands {
                self.pipeline.submit(command);
            }
            self.step()
        }

        fn pick(&mut self, target: ObjectId, grab_point: Vec3) -> TickReport {
            let command = Command::pick(self.tick, HAND, target, grab_point);
            self.step_with([command])
        }

        fn throw(&mut self, target: ObjectId, direction: Vec3, speed: f32) -> TickReport {
            let command = Command::throw(self.tick, HAND, target, direction, speed);
            self.step_with([command])
        }

        fn object(&self, id: ObjectId) -> &SimObject {
            self.world.find(id).expect("object exists")
        }

        fn hand(&self) -> HandState {
            *self.pipeline.hand_state(HAND).expect("hand registered")
        }

        fn events(&self) -> &[InteractionEvent] {
            self.pipeline.events().last_tick_events()
        }
    }

    fn pickable() -> CapabilityTags {
        CapabilityTags {
            pickable: true,
            ..CapabilityTags::default()
        }
    }

    fn dynamic_crate(position: Vec3) -> ObjectDesc {
        ObjectDesc::new("crate", position)
            .with_body(PhysicsBody::dynamic(1.0))
            .with_collider(Shape::Sphere { radius: 0.5 })
            .with_tags(pickable())
            .with_suppression_marker(false)
    }

    fn kinematic_ball(position: Vec3) -> ObjectDesc {
        ObjectDesc::new("ball", position)
            .with_body(PhysicsBody::kinematic())
            .with_collider(Shape::Sphere { radius: 0.25 })
            .with_tags(pickable())
            .with_suppression_marker(false)
    }

    fn wall(position: Vec3) -> ObjectDesc {
        ObjectDesc::new("wall", position).with_collider(Shape::Box {
            half_extents: Vec3::new(0.5, 5.0, 5.0),
        })
    }

    fn config_with_policy(policy: InteractionPolicy) -> InteractionConfig {
        InteractionConfig {
            policy,
            ..InteractionConfig::default()
        }
    }

    fn strict_config() -> InteractionConfig {
        config_with_policy(InteractionPolicy {
            missing_component_mode: MissingComponentMode::Strict,
            ..InteractionPolicy::default()
        })
    }

    #[test]
    fn pick_holds_object_and_records_grab_distance() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.world.find_mut(id).expect("crate").body.as_mut().expect("body").linear =
            Vec3::new(3.0, 0.0, 0.0);

        let report = harness.pick(id, Vec3::new(0.0, 5.0, 0.0));

        assert_eq!(report.commands.consumed.pick, 1);
        let hand = harness.hand();
        assert_eq!(hand.current_state, HandPhase::Holding);
        assert_eq!(hand.held_object, Some(id));
        assert!((hand.hold_distance - 5.0).abs() < 1e-6);

        let object = harness.object(id);
        assert_eq!(object.held_by, Some(HAND));
        assert!(object.is_movement_suppressed());
        assert_eq!(object.body.expect("body").linear, Vec3::ZERO);
        assert_eq!(
            harness.events(),
            &[InteractionEvent::Picked {
                hand: HAND,
                object: id
            }]
        );
    }

    #[test]
    fn hold_spring_settles_on_target_without_overshoot() {
        let mut harness = Harness::new(InteractionConfig::default()).with_host();
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        let target = Vec3::new(0.0, 5.0, 0.0);
        harness.pick(id, target);

        let mut highest = f32::MIN;
        for _ in 0..200 {
            let command = Command::hold(harness.tick, HAND, id, target);
            let report = harness.step_with([command]);
            assert_eq!(report.commands.consumed.hold, 1);
            highest = highest.max(harness.object(id).pose.position.y);
        }

        let object = harness.object(id);
        assert!(object.pose.position.distance(target) < 1e-2);
        assert!(highest <= target.y + 1e-3, "overshot to {highest}");
        assert_eq!(harness.hand().hold_point, target);
    }

    #[test]
    fn throw_launches_body_and_enters_cooldown() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);

        let report = harness.throw(id, Vec3::new(0.0, 2.0, 0.0), 20.0);

        assert_eq!(report.commands.consumed.throw, 1);
        assert_eq!(report.events.thrown, 1);
        let object = harness.object(id);
        let body = object.body.expect("body");
        // Dynamic bodies get gravity from the host, not from the pipeline.
        assert_eq!(body.linear, Vec3::new(0.0, 20.0, 0.0));
        assert_eq!(body.gravity_factor, Some(1.0));
        assert_eq!(object.held_by, None);
        assert_eq!(object.movement_suppressed, Some(false));
        let flight = object.in_flight.expect("in flight");
        assert_eq!(flight.initial_velocity, Vec3::new(0.0, 20.0, 0.0));

        let hand = harness.hand();
        assert_eq!(hand.current_state, HandPhase::Cooldown);
        assert_eq!(hand.held_object, None);
    }

    #[test]
    fn cooldown_expires_back_to_idle() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);
        harness.throw(id, Vec3::X, 5.0);

        for _ in 0..4 {
            harness.step();
        }
        assert_eq!(harness.hand().current_state, HandPhase::Cooldown);

        // Picking is refused while cooling down.
        let other = harness.spawn(dynamic_crate(Vec3::new(5.0, 0.0, 0.0)));
        let report = harness.pick(other, Vec3::ZERO);
        assert_eq!(report.commands.rejected.pick, 1);

        for _ in 0..4 {
            harness.step();
        }
        assert_eq!(harness.hand().current_state, HandPhase::Idle);
    }

    #[test]
    fn slingshot_charge_sets_launch_speed() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(
            dynamic_crate(Vec3::ZERO).with_body(PhysicsBody::dynamic(1.0).with_gravity_factor(2.0)),
        );
        harness.pick(id, Vec3::ZERO);

        let command = Command::slingshot(harness.tick, HAND, id, Vec3::X, 0.0, 0.5);
        let report = harness.step_with([command]);

        assert_eq!(report.commands.consumed.slingshot_throw, 1);
        assert_eq!(report.events.slingshot, 1);
        let body = harness.object(id).body.expect("body");
        assert!((body.linear - Vec3::new(22.5, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(body.gravity_factor, Some(2.0));
    }

    #[test]
    fn slingshot_without_body_drops_object() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(
            ObjectDesc::new("sack", Vec3::ZERO)
                .with_tags(pickable())
                .with_suppression_marker(false),
        );
        harness.pick(id, Vec3::ZERO);

        let command = Command::slingshot(harness.tick, HAND, id, Vec3::X, 0.0, 1.0);
        let report = harness.step_with([command]);

        assert_eq!(report.events.dropped, 1);
        let object = harness.object(id);
        assert_eq!(object.held_by, None);
        assert!(object.in_flight.is_none());
        assert_eq!(object.pose.position, Vec3::ZERO);
        assert_eq!(harness.hand().current_state, HandPhase::Cooldown);
        let diagnostics = harness.pipeline.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.has_reported(id, DiagnosticKind::MissingVelocity));
    }

    #[test]
    fn sweep_stops_fast_kinematic_projectile_at_wall() {
        let mut harness = Harness::new(InteractionConfig::default());
        let ball = harness.spawn(kinematic_ball(Vec3::ZERO));
        let wall = harness.spawn(wall(Vec3::new(2.0, 0.0, 0.0)));
        harness.pick(ball, Vec3::ZERO);

        let report = harness.throw(ball, Vec3::X, 200.0);

        assert_eq!(report.events.impacts, 1);
        let object = harness.object(ball);
        assert!(
            (object.pose.position.x - 1.24).abs() < 2e-3,
            "stopped at {}",
            object.pose.position.x
        );
        assert_eq!(object.body.expect("body").linear, Vec3::ZERO);
        assert!(object.in_flight.is_none());
        assert!(!object.impacted);

        let impact = harness
            .pipeline
            .events()
            .last_tick_impacts()
            .next()
            .copied()
            .expect("impact event");
        assert_eq!(impact.object, ball);
        assert_eq!(impact.other, wall);
        assert!(impact.normal.dot(Vec3::NEG_X) > 0.9);
    }

    #[test]
    fn ball_released_inside_wall_cannot_be_thrown_through_it() {
        let mut harness = Harness::new(InteractionConfig::default());
        let start = Vec3::new(1.3, 0.0, 0.0);
        let ball = harness.spawn(kinematic_ball(start));
        let wall = harness.spawn(wall(Vec3::new(2.0, 0.0, 0.0)));
        harness.pick(ball, start);

        let report = harness.throw(ball, Vec3::X, 200.0);

        assert_eq!(report.events.impacts, 1);
        let object = harness.object(ball);
        assert!(
            (object.pose.position.x - start.x).abs() < 1e-4,
            "stopped at {}",
            object.pose.position.x
        );
        assert!(object.in_flight.is_none());
        let impact = harness
            .pipeline
            .events()
            .last_tick_impacts()
            .next()
            .copied()
            .expect("impact event");
        assert_eq!(impact.other, wall);
        assert!(impact.normal.x < 0.0);
    }

    #[test]
    fn ball_released_inside_wall_can_be_thrown_away_from_it() {
        let mut harness = Harness::new(InteractionConfig::default());
        let start = Vec3::new(1.3, 0.0, 0.0);
        let ball = harness.spawn(kinematic_ball(start));
        harness.spawn(wall(Vec3::new(2.0, 0.0, 0.0)));
        harness.pick(ball, start);

        let report = harness.throw(ball, Vec3::NEG_X, 200.0);

        assert_eq!(report.events.impacts, 0);
        let object = harness.object(ball);
        assert!(object.pose.position.x < 0.0);
        assert!(object.in_flight.is_some());
    }

    #[test]
    fn colliderless_projectile_is_reported_once_and_never_swept() {
        let mut harness = Harness::new(InteractionConfig::default());
        let dart = harness.spawn(
            ObjectDesc::new("dart", Vec3::ZERO)
                .with_body(PhysicsBody::kinematic())
                .with_tags(pickable())
                .with_suppression_marker(false),
        );
        harness.spawn(wall(Vec3::new(2.0, 0.0, 0.0)));
        harness.pick(dart, Vec3::ZERO);

        let report = harness.throw(dart, Vec3::X, 200.0);
        assert_eq!(report.events.impacts, 0);
        harness.step();

        let object = harness.object(dart);
        assert!(object.pose.position.x > 2.5);
        assert!(object.in_flight.is_some());
        let diagnostics = harness.pipeline.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.has_reported(dart, DiagnosticKind::MissingCollider));
    }

    #[test]
    fn impact_triggered_object_despawns_on_next_tick() {
        let mut harness = Harness::new(InteractionConfig::default());
        let ball = harness.spawn(kinematic_ball(Vec3::ZERO).with_tags(CapabilityTags {
            pickable: true,
            impact_triggered: true,
            ..CapabilityTags::default()
        }));
        harness.spawn(wall(Vec3::new(2.0, 0.0, 0.0)));
        harness.pick(ball, Vec3::ZERO);
        harness.throw(ball, Vec3::X, 200.0);
        assert!(harness.object(ball).impacted);

        let report = harness.step();

        assert_eq!(report.despawned, 1);
        assert!(harness.world.find(ball).is_none());
    }

    #[test]
    fn queued_throws_release_together_in_queue_order() {
        let mut harness = Harness::new(InteractionConfig::default());
        let first = harness.spawn(dynamic_crate(Vec3::ZERO));
        let second = harness.spawn(dynamic_crate(Vec3::new(3.0, 0.0, 0.0)));

        for (id, direction) in [(first, Vec3::X), (second, Vec3::Z)] {
            harness.pick(id, Vec3::ZERO);
            let command = Command::queue_throw(harness.tick, HAND, id, direction, 8.0);
            let report = harness.step_with([command]);
            assert_eq!(report.events.staged, 1);
            assert_eq!(harness.hand().current_state, HandPhase::Idle);
            assert_eq!(harness.object(id).staged_by, Some(HAND));
        }
        assert_eq!(harness.pipeline.hand(HAND).expect("hand").queue.len(), 2);

        harness.inputs.insert(
            HAND,
            HandInput::new(1).with_action(HandAction::ReleaseAll, true),
        );
        let report = harness.step();

        assert_eq!(report.commands.emitted_throws, 2);
        assert_eq!(report.commands.consumed.throw, 2);
        let released: Vec<_> = harness
            .events()
            .iter()
            .filter_map(|event| match event {
                InteractionEvent::Released {
                    object,
                    kind: ReleaseKind::Throw,
                    velocity,
                    ..
                } => Some((*object, *velocity)),
                _ => None,
            })
            .collect();
        assert_eq!(
            released,
            vec![
                (first, Vec3::new(8.0, 0.0, 0.0)),
                (second, Vec3::new(0.0, 0.0, 8.0))
            ]
        );
        assert!(harness.pipeline.hand(HAND).expect("hand").queue.is_empty());
        for id in [first, second] {
            let object = harness.object(id);
            assert!(object.in_flight.is_some());
            assert_eq!(object.staged_by, None);
        }
    }

    #[test]
    fn release_one_fires_once_per_press() {
        let mut harness = Harness::new(InteractionConfig::default());
        let first = harness.spawn(dynamic_crate(Vec3::ZERO));
        let second = harness.spawn(dynamic_crate(Vec3::new(3.0, 0.0, 0.0)));
        for id in [first, second] {
            harness.pick(id, Vec3::ZERO);
            let command = Command::queue_throw(harness.tick, HAND, id, Vec3::Y, 4.0);
            harness.step_with([command]);
        }

        let pressed = |sample_id| HandInput::new(sample_id).with_action(HandAction::ReleaseOne, true);
        harness.inputs.insert(HAND, pressed(10));
        assert_eq!(harness.step().commands.emitted_throws, 1);
        assert!(harness.object(first).in_flight.is_some());
        assert!(harness.object(second).in_flight.is_none());

        // Same sample again, then a new sample with the button still down.
        assert_eq!(harness.step().commands.emitted_throws, 0);
        harness.inputs.insert(HAND, pressed(11));
        assert_eq!(harness.step().commands.emitted_throws, 0);

        harness.inputs.insert(HAND, HandInput::new(12));
        harness.step();
        harness.inputs.insert(HAND, pressed(13));
        assert_eq!(harness.step().commands.emitted_throws, 1);
        assert!(harness.object(second).in_flight.is_some());
    }

    #[test]
    fn pick_removes_object_from_throw_queue() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);
        let command = Command::queue_throw(harness.tick, HAND, id, Vec3::Y, 4.0);
        harness.step_with([command]);

        harness.pick(id, Vec3::ZERO);

        let controller = harness.pipeline.hand(HAND).expect("hand");
        assert!(controller.queue.is_empty());
        assert!(controller.state.is_holding(id));
        assert_eq!(harness.object(id).staged_by, None);
    }

    #[test]
    fn stale_commands_are_pruned_and_future_commands_wait() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pipeline.submit(Command::pick(3, HAND, id, Vec3::ZERO));

        for _ in 0..3 {
            let report = harness.step();
            assert_eq!(report.commands.consumed.total, 0);
        }
        assert_eq!(harness.pipeline.pending_commands().len(), 1);
        harness.pipeline.submit(Command::hold(1, HAND, id, Vec3::Y));

        let report = harness.step();

        assert_eq!(report.commands.pruned, 1);
        assert_eq!(report.commands.consumed.pick, 1);
        assert!(harness.pipeline.pending_commands().is_empty());
    }

    #[test]
    fn duplicate_throw_in_one_tick_applies_once() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);

        let tick = harness.tick;
        let report = harness.step_with([
            Command::throw(tick, HAND, id, Vec3::X, 6.0),
            Command::throw(tick, HAND, id, Vec3::Y, 9.0),
        ]);

        assert_eq!(report.commands.consumed.throw, 1);
        assert_eq!(report.commands.rejected.throw, 1);
        assert_eq!(report.events.thrown, 1);
        assert_eq!(
            harness.object(id).body.expect("body").linear,
            Vec3::new(6.0, 0.0, 0.0)
        );
    }

    #[test]
    fn first_pick_claim_wins_across_hands() {
        let mut harness = Harness::new(InteractionConfig::default());
        let other_hand = HandId(1);
        assert!(harness.pipeline.register_hand(other_hand));
        assert!(!harness.pipeline.register_hand(other_hand));
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));

        let tick = harness.tick;
        let report = harness.step_with([
            Command::pick(tick, other_hand, id, Vec3::ZERO),
            Command::pick(tick, HAND, id, Vec3::ZERO),
        ]);

        assert_eq!(report.commands.consumed.pick, 1);
        assert_eq!(report.commands.rejected.pick, 1);
        assert_eq!(harness.object(id).held_by, Some(other_hand));
        assert_eq!(harness.hand().current_state, HandPhase::Idle);
        let winner = harness.pipeline.hand_state(other_hand).expect("hand");
        assert!(winner.is_holding(id));
    }

    #[test]
    fn pick_for_unregistered_hand_is_rejected() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        let tick = harness.tick;

        let report = harness.step_with([Command::pick(tick, HandId(7), id, Vec3::ZERO)]);

        assert_eq!(report.commands.rejected.pick, 1);
        assert_eq!(harness.object(id).held_by, None);
    }

    #[test]
    fn never_pickable_wins_over_pickable() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO).with_tags(CapabilityTags {
            pickable: true,
            never_pickable: true,
            ..CapabilityTags::default()
        }));

        let report = harness.pick(id, Vec3::ZERO);

        assert_eq!(report.commands.rejected.pick, 1);
        assert_eq!(harness.hand().current_state, HandPhase::Idle);
    }

    #[test]
    fn strict_mode_refuses_pick_without_suppression_marker() {
        let mut harness = Harness::new(strict_config());
        let id = harness.spawn(ObjectDesc::new("crate", Vec3::ZERO).with_tags(pickable()));

        let report = harness.pick(id, Vec3::ZERO);

        assert_eq!(report.commands.rejected.pick, 1);
        assert_eq!(harness.object(id).movement_suppressed, None);
        assert!(harness
            .pipeline
            .diagnostics()
            .has_reported(id, DiagnosticKind::MissingSuppressionMarker));
    }

    #[test]
    fn fallback_mode_attaches_missing_suppression_marker() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(ObjectDesc::new("crate", Vec3::ZERO).with_tags(pickable()));

        let report = harness.pick(id, Vec3::ZERO);

        assert_eq!(report.commands.consumed.pick, 1);
        assert_eq!(harness.object(id).movement_suppressed, Some(true));
        assert_eq!(harness.pipeline.diagnostics().len(), 1);
    }

    #[test]
    fn strict_slingshot_leaves_missing_gravity_factor_unset() {
        let mut harness = Harness::new(strict_config());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);

        let command = Command::slingshot(harness.tick, HAND, id, Vec3::X, 12.0, 0.0);
        harness.step_with([command]);

        let object = harness.object(id);
        assert!(object.in_flight.is_some());
        assert_eq!(object.body.expect("body").gravity_factor, None);
        assert!(harness
            .pipeline
            .diagnostics()
            .has_reported(id, DiagnosticKind::MissingGravityFactor));
    }

    #[test]
    fn fallback_slingshot_synthesizes_gravity_factor() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);

        let command = Command::slingshot(harness.tick, HAND, id, Vec3::X, 12.0, 0.0);
        harness.step_with([command]);

        assert_eq!(harness.object(id).body.expect("body").gravity_factor, Some(1.0));
    }

    #[test]
    fn kinematic_flight_gets_gravity_exactly_once_per_tick() {
        let mut harness = Harness::new(InteractionConfig::default()).with_host();
        let id = harness.spawn(
            ObjectDesc::new("dart", Vec3::ZERO)
                .with_body(PhysicsBody::kinematic())
                .with_tags(pickable())
                .with_suppression_marker(false),
        );
        harness.pick(id, Vec3::ZERO);
        harness.throw(id, Vec3::X, 1.0);

        let step_velocity = -9.81 * DT;
        let object = harness.object(id);
        assert!((object.body.expect("body").linear.y - step_velocity).abs() < 1e-5);
        assert!((object.in_flight.expect("flight").time_since_release - DT).abs() < 1e-7);

        harness.step();
        let body = harness.object(id).body.expect("body");
        assert!((body.linear.y - 2.0 * step_velocity).abs() < 1e-5);
        assert!((body.linear.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unheld_hold_command_is_unresolved_then_pruned() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));

        let command = Command::hold(harness.tick, HAND, id, Vec3::Y);
        let report = harness.step_with([command]);
        assert_eq!(report.commands.unresolved.hold, 1);
        assert_eq!(harness.pipeline.pending_commands().len(), 1);

        let report = harness.step();
        assert_eq!(report.commands.pruned, 1);
        assert!(harness.pipeline.pending_commands().is_empty());
    }

    #[test]
    fn world_grab_hold_lerps_bodiless_object() {
        let mut harness = Harness::new(config_with_policy(InteractionPolicy {
            world_grab_enabled: true,
            ..InteractionPolicy::default()
        }));
        let id = harness.spawn(
            ObjectDesc::new("lever", Vec3::ZERO)
                .with_tags(CapabilityTags {
                    manipulable: true,
                    ..CapabilityTags::default()
                })
                .with_follow_factor(0.5)
                .with_suppression_marker(false),
        );

        // Without the modifier a manipulable object is not pickable.
        assert_eq!(harness.pick(id, Vec3::ZERO).commands.rejected.pick, 1);

        harness.inputs.insert(
            HAND,
            HandInput::new(1).with_action(HandAction::WorldGrabModifier, true),
        );
        assert_eq!(harness.pick(id, Vec3::ZERO).commands.consumed.pick, 1);

        let command = Command::hold(harness.tick, HAND, id, Vec3::new(4.0, 0.0, 0.0));
        let report = harness.step_with([command]);

        assert_eq!(report.commands.consumed.hold, 1);
        assert_eq!(harness.object(id).pose.position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn bodiless_hold_without_world_grab_is_unresolved() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(
            ObjectDesc::new("sack", Vec3::ZERO)
                .with_tags(pickable())
                .with_suppression_marker(false),
        );
        harness.pick(id, Vec3::ZERO);

        let command = Command::hold(harness.tick, HAND, id, Vec3::X);
        let report = harness.step_with([command]);

        assert_eq!(report.commands.unresolved.hold, 1);
        assert_eq!(harness.object(id).pose.position, Vec3::ZERO);
    }

    #[test]
    fn auto_pick_is_offered_on_hover_but_refused_by_pickup() {
        let policy = InteractionPolicy {
            auto_pick_dynamic: true,
            ..InteractionPolicy::default()
        };
        let mut harness = Harness::new(config_with_policy(policy));
        let id = harness.spawn(dynamic_crate(Vec3::ZERO).with_tags(CapabilityTags::default()));
        harness.inputs.insert(
            HAND,
            HandInput::new(1).with_hover_ray(Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z)),
        );

        let report = harness.pick(id, Vec3::ZERO);

        let frame = harness.pipeline.frame(HAND).expect("frame");
        let hover = frame.hover.expect("hover hit");
        assert_eq!(hover.object, id);
        assert!((hover.distance - 4.5).abs() < 1e-4);
        assert!(frame.affordances.contains(Affordance::PickUp));
        assert_eq!(report.commands.rejected.pick, 1);

        harness.pipeline.set_policy(InteractionPolicy {
            auto_pick_in_pickup: true,
            ..policy
        });
        let report = harness.pick(id, Vec3::ZERO);
        assert_eq!(report.commands.consumed.pick, 1);
    }

    #[test]
    fn hover_ignores_the_held_object() {
        let mut harness = Harness::new(InteractionConfig::default());
        let near = harness.spawn(dynamic_crate(Vec3::ZERO));
        let far = harness.spawn(dynamic_crate(Vec3::new(0.0, 0.0, 3.0)));
        harness.inputs.insert(
            HAND,
            HandInput::new(1).with_hover_ray(Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z)),
        );

        harness.pick(near, Vec3::ZERO);
        let hover = harness.pipeline.frame(HAND).and_then(|frame| frame.hover);
        assert_eq!(hover.map(|hit| hit.object), Some(near));

        harness.step();
        let hover = harness.pipeline.frame(HAND).and_then(|frame| frame.hover);
        assert_eq!(hover.map(|hit| hit.object), Some(far));
    }

    #[test]
    fn hand_returns_to_idle_when_held_object_disappears() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);

        harness.world.despawn(id);
        harness.world.apply_pending();
        harness.step();

        let hand = harness.hand();
        assert_eq!(hand.current_state, HandPhase::Idle);
        assert_eq!(hand.held_object, None);
    }

    #[test]
    fn non_live_modes_are_inert_and_drop_pending_commands() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pipeline.submit(Command::pick(0, HAND, id, Vec3::ZERO));

        for mode in [SimMode::Rewind, SimMode::Playback] {
            let report = harness
                .pipeline
                .run_tick(0, DT, mode, &harness.inputs, &mut harness.world);
            assert!(!report.ran);
            assert!(harness.pipeline.last_tick_order().is_empty());
        }
        assert!(harness.pipeline.pending_commands().is_empty());
        assert_eq!(harness.object(id).held_by, None);

        // Back to live, the same tick number is accepted again.
        let report = harness.pick(id, Vec3::ZERO);
        assert!(report.ran);
        assert_eq!(report.commands.consumed.pick, 1);
    }

    #[test]
    fn repeated_tick_is_a_no_op() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(dynamic_crate(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);
        harness.pipeline.submit(Command::throw(0, HAND, id, Vec3::X, 4.0));

        let report = harness
            .pipeline
            .run_tick(0, DT, SimMode::Live, &harness.inputs, &mut harness.world);

        assert!(!report.ran);
        assert_eq!(harness.object(id).held_by, Some(HAND));
    }

    #[test]
    fn invalid_delta_is_treated_as_zero() {
        let mut harness = Harness::new(InteractionConfig::default());
        let id = harness.spawn(kinematic_ball(Vec3::ZERO));
        harness.pick(id, Vec3::ZERO);
        harness.throw(id, Vec3::X, 1.0);
        let before = harness.object(id).pose;

        let report = harness.pipeline.run_tick(
            harness.tick,
            f32::NAN,
            SimMode::Live,
            &harness.inputs,
            &mut harness.world,
        );

        assert!(report.ran);
        assert_eq!(harness.object(id).pose, before);
    }

    #[test]
    fn stages_run_in_declared_order() {
        let mut harness = Harness::new(InteractionConfig::default());
        harness.step();

        let order = harness.pipeline.last_tick_order();
        assert_eq!(order, STAGE_ORDER.as_slice());
        let names: Vec<_> = order.iter().map(|stage| stage.name()).collect();
        assert_eq!(names.first(), Some(&"Housekeeping"));
        assert_eq!(names.last(), Some(&"Sweep"));
    }

    fn scripted_run(speed: f32) -> String {
        let mut harness = Harness::new(InteractionConfig::default()).with_host();
        let ball = harness.spawn(kinematic_ball(Vec3::ZERO));
        let crate_id = harness.spawn(dynamic_crate(Vec3::new(0.0, 0.0, 4.0)));
        harness.spawn(wall(Vec3::new(6.0, 0.0, 0.0)));

        harness.pick(ball, Vec3::ZERO);
        harness.throw(ball, Vec3::new(1.0, 0.2, 0.0), speed);
        for _ in 0..8 {
            harness.step();
        }
        harness.pick(crate_id, Vec3::new(0.0, 2.0, 4.0));
        for _ in 0..30 {
            let command = Command::hold(harness.tick, HAND, crate_id, Vec3::new(0.0, 2.0, 4.0));
            harness.step_with([command]);
        }
        world_digest(&harness.world, &harness.pipeline)
    }

    #[test]
    fn identical_runs_produce_identical_digests() {
        assert_eq!(scripted_run(30.0), scripted_run(30.0));
        assert_ne!(scripted_run(30.0), scripted_run(31.0));
    }
