//! Session context.
//!
//! A [`Session`] owns every character of a match on this peer, the shared
//! mass registry, the hazard set and the simulation clock. It is handed to
//! camera, HUD and damage-source collaborators explicitly; there is no global
//! "local player".

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::ControllerConfig;
use crate::controller::{Character, TickContext};
use crate::error::SetupError;
use crate::events::{CharacterEvent, ReleaseReason};
use crate::mass_registry::MassRegistry;
use crate::replication::{RemoteView, ReplicatedState};
use engine_core::{BodyId, ParticipantId, Quat, Tick, Time, Vec3};
use input::InputSample;
use physics::{PhysicsBackend, RagdollRig, RigDesc};

/// What this peer is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Simulates every character and accepts damage requests.
    Authority,
    /// Only receives and interpolates replicated state.
    Observer,
}

pub struct Session {
    config: ControllerConfig,
    role: Role,
    local: ParticipantId,
    time: Time,
    last_tick: Tick,
    characters: BTreeMap<ParticipantId, Character>,
    remotes: BTreeMap<ParticipantId, RemoteView>,
    pending_input: BTreeMap<ParticipantId, InputSample>,
    registry: MassRegistry,
    hazards: BTreeSet<BodyId>,
    outbox: Vec<ReplicatedState>,
    events: Vec<CharacterEvent>,
}

impl Session {
    pub fn new(role: Role, local: ParticipantId, mut config: ControllerConfig) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("{}, ticking at the default rate", e);
            config.tick_rate = ControllerConfig::default().tick_rate;
        }
        let time = Time::with_rate(config.tick_rate);
        let last_tick = Tick {
            index: 0,
            dt: time.fixed_timestep_seconds(),
            now: 0.0,
        };
        Self {
            config,
            role,
            local,
            time,
            last_tick,
            characters: BTreeMap::new(),
            remotes: BTreeMap::new(),
            pending_input: BTreeMap::new(),
            registry: MassRegistry::new(),
            hazards: BTreeSet::new(),
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Session for the peer that simulates everything.
    pub fn authority(local: ParticipantId, config: ControllerConfig) -> Self {
        Self::new(Role::Authority, local, config)
    }

    /// Session for a peer that only watches.
    pub fn observer(local: ParticipantId, config: ControllerConfig) -> Self {
        Self::new(Role::Observer, local, config)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_authority(&self) -> bool {
        self.role == Role::Authority
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn local_participant(&self) -> ParticipantId {
        self.local
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.time.simulation_time()
    }

    /// Render interpolation factor between the last two ticks.
    ///
    /// Only moves when frames are fed through [`Session::advance_frame`].
    pub fn render_alpha(&self) -> f32 {
        self.time.alpha().clamp(0.0, 1.0)
    }

    /// Feed one render frame's duration into the session clock.
    pub fn advance_frame(&mut self, delta: Duration) {
        self.time.advance(delta);
    }

    /// Whether the frame clock holds a whole tick waiting to be simulated.
    pub fn tick_due(&self) -> bool {
        self.time.tick_due()
    }

    /// Tick stamp for work done between ticks, at the current simulation time.
    fn between_ticks(&self) -> Tick {
        Tick {
            now: self.now(),
            ..self.last_tick
        }
    }

    /// Spawn a character for `participant` from a rig the host has built.
    pub fn join(
        &mut self,
        physics: &dyn PhysicsBackend,
        participant: ParticipantId,
        desc: RigDesc,
    ) -> Result<&Character, SetupError> {
        if self.characters.contains_key(&participant) {
            return Err(SetupError::AlreadyJoined(participant));
        }
        let rig = RagdollRig::capture(physics, desc)?;
        let character = Character::new(participant, rig, &self.config, self.is_authority());
        if !self.is_authority() {
            self.remotes.insert(participant, RemoteView::new());
        }
        log::info!("{} joined with root {}", participant, character.root());
        Ok(self.characters.entry(participant).or_insert(character))
    }

    /// Despawn a participant's character, releasing anything it holds first.
    pub fn leave(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        participant: ParticipantId,
    ) -> Result<(), SetupError> {
        let tick = self.between_ticks();
        let mut character = self
            .characters
            .remove(&participant)
            .ok_or(SetupError::UnknownParticipant(participant))?;

        let ragdolled = BTreeSet::new();
        let mut ctx = TickContext {
            physics: &mut *physics,
            registry: &mut self.registry,
            config: &self.config,
            hazards: &self.hazards,
            ragdolled_roots: &ragdolled,
            events: &mut self.events,
            tick,
        };
        character.release_hands(&mut ctx, ReleaseReason::Despawn);

        for body in character.rig().bodies() {
            physics.remove_body(body);
        }
        self.remotes.remove(&participant);
        self.pending_input.remove(&participant);
        log::info!("{} left", participant);
        Ok(())
    }

    /// Queue input for the next tick.
    ///
    /// Several samples before one tick fold into one: look deltas add up,
    /// button edges are kept, everything else takes the newest value.
    pub fn submit_input(&mut self, participant: ParticipantId, sample: InputSample) {
        self.pending_input
            .entry(participant)
            .and_modify(|pending| {
                let look_delta = pending.look_delta + sample.look_delta;
                let jump = pending.jump || sample.jump;
                let recover = pending.recover || sample.recover;
                *pending = InputSample {
                    look_delta,
                    jump,
                    recover,
                    ..sample
                };
            })
            .or_insert(sample);
    }

    /// Advance one fixed tick for every character this peer simulates.
    ///
    /// Call once per tick before stepping the physics world. Returns the
    /// events produced since the previous call.
    pub fn step(&mut self, physics: &mut dyn PhysicsBackend) -> Vec<CharacterEvent> {
        let tick = self.time.step();
        self.run_tick(physics, tick)
    }

    /// Like [`Session::step`], but only when the frame clock has a whole tick
    /// due. Returns `None` once the accumulator is drained.
    pub fn step_due(&mut self, physics: &mut dyn PhysicsBackend) -> Option<Vec<CharacterEvent>> {
        let tick = self.time.next_fixed_tick()?;
        Some(self.run_tick(physics, tick))
    }

    fn run_tick(&mut self, physics: &mut dyn PhysicsBackend, tick: Tick) -> Vec<CharacterEvent> {
        self.last_tick = tick;
        let inputs = std::mem::take(&mut self.pending_input);

        if self.is_authority() {
            let ragdolled: BTreeSet<BodyId> = self
                .characters
                .values()
                .filter(|c| !c.is_active())
                .map(|c| c.root())
                .collect();
            let broken = physics.drain_broken_constraints();

            let mut ctx = TickContext {
                physics: &mut *physics,
                registry: &mut self.registry,
                config: &self.config,
                hazards: &self.hazards,
                ragdolled_roots: &ragdolled,
                events: &mut self.events,
                tick,
            };

            for id in broken {
                for character in self.characters.values_mut() {
                    if character.handle_broken_constraint(&mut ctx, id) {
                        break;
                    }
                }
            }

            for (participant, character) in self.characters.iter_mut() {
                let input = inputs.get(participant).copied().unwrap_or_default();
                character.tick(&mut ctx, &input);
            }

            for character in self.characters.values() {
                self.outbox
                    .push(character.replicated_state(&*physics, tick.index));
            }
        }

        std::mem::take(&mut self.events)
    }

    /// Damage a participant's character. Rejected on peers without authority.
    pub fn request_damage(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        target: ParticipantId,
        amount: i32,
        impulse: Vec3,
        part: BodyId,
    ) -> bool {
        if !self.is_authority() {
            log::debug!("damage request for {} rejected: no authority", target);
            return false;
        }
        let tick = self.between_ticks();
        let ragdolled = BTreeSet::new();
        let Some(character) = self.characters.get_mut(&target) else {
            return false;
        };
        let mut ctx = TickContext {
            physics,
            registry: &mut self.registry,
            config: &self.config,
            hazards: &self.hazards,
            ragdolled_roots: &ragdolled,
            events: &mut self.events,
            tick,
        };
        character.apply_damage(&mut ctx, amount, impulse, part)
    }

    /// Knock a character over without damaging it.
    pub fn stagger(&mut self, physics: &mut dyn PhysicsBackend, target: ParticipantId) -> bool {
        if !self.is_authority() {
            return false;
        }
        let tick = self.between_ticks();
        let ragdolled = BTreeSet::new();
        let Some(character) = self.characters.get_mut(&target) else {
            return false;
        };
        let mut ctx = TickContext {
            physics,
            registry: &mut self.registry,
            config: &self.config,
            hazards: &self.hazards,
            ragdolled_roots: &ragdolled,
            events: &mut self.events,
            tick,
        };
        character.make_ragdoll(&mut ctx)
    }

    /// Replicated samples written since the last call, for the transport.
    pub fn take_snapshots(&mut self) -> Vec<ReplicatedState> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply a sample received from the authority. Stale samples are dropped.
    ///
    /// Accepted samples also update the mirrored character, so camera and HUD
    /// readers see replicated health, stamina and grab state.
    pub fn receive_snapshot(&mut self, state: ReplicatedState) -> bool {
        if self.is_authority() {
            return false;
        }
        let participant = state.participant;
        let view = self.remotes.entry(participant).or_default();
        if !view.receive(state) {
            return false;
        }
        if let (Some(latest), Some(character)) =
            (view.latest(), self.characters.get_mut(&participant))
        {
            character.apply_replicated(latest);
        }
        true
    }

    /// Part rotations of an observed character for the current render frame.
    pub fn interpolated_pose(&self, participant: ParticipantId) -> Vec<Quat> {
        self.remotes
            .get(&participant)
            .map(|view| view.interpolated_rotations(self.render_alpha()))
            .unwrap_or_default()
    }

    pub fn remote(&self, participant: ParticipantId) -> Option<&RemoteView> {
        self.remotes.get(&participant)
    }

    /// The character driven by this peer's own input, for camera and HUD.
    pub fn local_character(&self) -> Option<&Character> {
        self.characters.get(&self.local)
    }

    pub fn character(&self, participant: ParticipantId) -> Option<&Character> {
        self.characters.get(&participant)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Root body of every character, in participant order.
    pub fn character_roots(&self) -> Vec<(ParticipantId, BodyId)> {
        self.characters
            .iter()
            .map(|(id, c)| (*id, c.root()))
            .collect()
    }

    pub fn registry(&self) -> &MassRegistry {
        &self.registry
    }

    /// Mark a body as dealing impact damage.
    pub fn add_hazard(&mut self, body: BodyId) {
        self.hazards.insert(body);
    }

    pub fn remove_hazard(&mut self, body: BodyId) -> bool {
        self.hazards.remove(&body)
    }

    pub fn is_hazard(&self, body: BodyId) -> bool {
        self.hazards.contains(&body)
    }

    /// Forget a body that left the world.
    pub fn forget_body(&mut self, body: BodyId) {
        self.hazards.remove(&body);
    }

    /// Events produced outside [`Session::step`], such as damage requests.
    pub fn drain_events(&mut self) -> Vec<CharacterEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HandSide;
    use crate::testing::build_rig;
    use engine_core::Vec2;
    use physics::{BodyKind, Contact, HeadlessWorld};

    const HOST: ParticipantId = ParticipantId(1);
    const GUEST: ParticipantId = ParticipantId(2);

    fn world() -> HeadlessWorld {
        HeadlessWorld::new(1.0 / 60.0)
    }

    fn run(session: &mut Session, world: &mut HeadlessWorld) -> Vec<CharacterEvent> {
        let events = session.step(world);
        world.step();
        events
    }

    #[test]
    fn joining_twice_is_refused() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let first = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let second = build_rig(&mut world, Vec3::new(2.0, 0.3, 0.0));
        session.join(&world, HOST, first).unwrap();
        assert!(matches!(
            session.join(&world, HOST, second),
            Err(SetupError::AlreadyJoined(HOST))
        ));
        assert!(matches!(
            session.leave(&mut world, GUEST),
            Err(SetupError::UnknownParticipant(GUEST))
        ));
    }

    #[test]
    fn join_fails_fast_on_missing_body() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut desc = build_rig(&mut world, Vec3::ZERO);
        desc.left_hand = BodyId(9999);
        assert!(matches!(
            session.join(&world, HOST, desc),
            Err(SetupError::MissingBody { .. })
        ));
        assert!(session.local_character().is_none());
    }

    #[test]
    fn each_sample_is_consumed_once_and_look_deltas_add_up() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        session.join(&world, HOST, desc).unwrap();

        session.submit_input(
            HOST,
            InputSample {
                look_delta: Vec2::new(-4.0, 0.0),
                jump: true,
                ..InputSample::default()
            },
        );
        session.submit_input(
            HOST,
            InputSample {
                look_delta: Vec2::new(-6.0, 0.0),
                ..InputSample::default()
            },
        );
        let events = run(&mut session, &mut world);
        let yaw = session.local_character().unwrap().look_yaw_deg();
        assert!((yaw - 25.0).abs() < 1e-4);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, CharacterEvent::Jumped { .. }))
                .count(),
            1
        );

        // Nothing submitted: neutral input, no second jump.
        let events = run(&mut session, &mut world);
        assert!(!events.iter().any(|e| matches!(e, CharacterEvent::Jumped { .. })));
        assert!((session.local_character().unwrap().look_yaw_deg() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn broken_constraint_is_released_at_start_of_tick() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let hand = desc.right_hand;
        session.join(&world, HOST, desc).unwrap();
        let at = world.pose(hand).unwrap().position + Vec3::new(0.0, 0.0, -0.25);
        let crate_body = world.add_body(BodyKind::Dynamic, 2.0, 0.15, at);

        let grab = InputSample {
            right_grab: true,
            ..InputSample::default()
        };
        session.submit_input(HOST, grab);
        run(&mut session, &mut world);
        let character = session.local_character().unwrap();
        let constraint = character.hand(HandSide::Right).latch().unwrap().constraint;

        world.break_constraint(constraint);
        session.submit_input(HOST, grab);
        let events = run(&mut session, &mut world);
        assert!(events.iter().any(|e| matches!(
            e,
            CharacterEvent::GrabReleased {
                reason: ReleaseReason::Broken,
                ..
            }
        )));
        assert_eq!(world.mass(crate_body), Some(2.0));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn leaving_releases_grabs_and_removes_bodies() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let hand = desc.left_hand;
        let root = desc.root;
        session.join(&world, HOST, desc).unwrap();
        let at = world.pose(hand).unwrap().position + Vec3::new(0.0, 0.0, -0.25);
        let crate_body = world.add_body(BodyKind::Dynamic, 2.0, 0.15, at);

        session.submit_input(
            HOST,
            InputSample {
                left_grab: true,
                ..InputSample::default()
            },
        );
        run(&mut session, &mut world);
        assert_eq!(world.mass(crate_body), Some(0.5));

        session.leave(&mut world, HOST).unwrap();
        assert_eq!(world.mass(crate_body), Some(2.0));
        assert!(!world.body_exists(root));
        assert_eq!(world.constraint_count(), 0);
        assert!(session.local_character().is_none());
    }

    #[test]
    fn observers_reject_damage_and_simulate_nothing() {
        let mut world = world();
        let mut session = Session::observer(GUEST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let root = desc.root;
        session.join(&world, HOST, desc).unwrap();

        assert!(!session.request_damage(&mut world, HOST, 50, Vec3::ZERO, root));
        assert!(!session.stagger(&mut world, HOST));
        run(&mut session, &mut world);
        assert!(session.take_snapshots().is_empty());
        assert_eq!(session.character(HOST).unwrap().health().current, 100);
    }

    #[test]
    fn snapshots_flow_from_authority_to_observer() {
        let mut host_world = world();
        let mut host = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut host_world, Vec3::new(0.0, 0.3, 0.0));
        let root = desc.root;
        host.join(&host_world, HOST, desc).unwrap();

        let mut guest_world = world();
        let mut guest = Session::observer(GUEST, ControllerConfig::default());
        let guest_desc = build_rig(&mut guest_world, Vec3::new(0.0, 0.3, 0.0));
        guest.join(&guest_world, HOST, guest_desc).unwrap();

        run(&mut host, &mut host_world);
        assert!(host.request_damage(&mut host_world, HOST, 30, Vec3::ZERO, root));
        run(&mut host, &mut host_world);

        let snapshots = host.take_snapshots();
        assert_eq!(snapshots.len(), 2);
        assert!(host.take_snapshots().is_empty());

        let latest = snapshots[1].clone();
        for state in snapshots {
            assert!(guest.receive_snapshot(state));
        }
        assert!(!guest.receive_snapshot(latest));

        let view = guest.remote(HOST).unwrap();
        assert_eq!(view.latest().unwrap().health, 70);
        assert_eq!(guest.interpolated_pose(HOST).len(), 4);
    }

    #[test]
    fn damage_request_death_shows_up_in_events() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let root = desc.root;
        session.join(&world, HOST, desc).unwrap();

        assert!(session.request_damage(&mut world, HOST, 100, Vec3::ZERO, root));
        let events = run(&mut session, &mut world);
        assert!(events.iter().any(|e| matches!(e, CharacterEvent::Died { .. })));
        assert!(session.local_character().unwrap().is_dead());
        assert!(!session.request_damage(&mut world, HOST, 10, Vec3::ZERO, root));
    }

    #[test]
    fn limp_characters_are_tossed_harder() {
        let mut world = world();
        world.ground_height = None;
        world.gravity = Vec3::ZERO;
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let host_desc = build_rig(&mut world, Vec3::new(0.0, 1.0, 0.0));
        let hand = host_desc.right_hand;
        session.join(&world, HOST, host_desc).unwrap();

        // The guest's torso sits right in front of the host's right hand.
        let at = world.pose(hand).unwrap().position + Vec3::new(0.0, 0.0, -0.35);
        let guest_desc = build_rig(&mut world, at);
        let guest_root = guest_desc.root;
        session.join(&world, GUEST, guest_desc).unwrap();
        session.stagger(&mut world, GUEST);

        let grab = InputSample {
            right_grab: true,
            ..InputSample::default()
        };
        session.submit_input(HOST, grab);
        run(&mut session, &mut world);
        assert_eq!(
            session.local_character().unwrap().held_body(HandSide::Right),
            Some(guest_root)
        );

        world.clear_impulse_log();
        run(&mut session, &mut world);
        let tossed = world.impulses_on(guest_root);
        assert_eq!(tossed, vec![Vec3::new(0.0, 3.75, -15.0)]);
    }

    #[test]
    fn registered_hazards_hurt_until_removed() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let root = session.join(&world, HOST, desc).unwrap().root();
        let saw = world.add_body(BodyKind::Kinematic, 50.0, 0.2, Vec3::new(5.0, 0.3, 0.0));
        session.add_hazard(saw);
        assert!(session.is_hazard(saw));

        let hit = Contact {
            other: Some(saw),
            other_root: Some(saw),
            point: Vec3::new(0.3, 0.3, 0.0),
            impulse: Vec3::new(0.0, 0.0, 30.0 / 60.0),
        };
        world.script_contact(root, hit);
        run(&mut session, &mut world);

        let character = session.local_character().unwrap();
        assert_eq!(session.local_participant(), HOST);
        assert!(character.has_authority());
        assert!((character.health_fraction() - 0.8).abs() < 1e-6);
        assert!((character.stamina_fraction() - 1.0).abs() < 1e-6);
        assert!(character.camera_rotation().is_normalized());

        assert!(session.remove_hazard(saw));
        world.script_contact(root, hit);
        run(&mut session, &mut world);
        assert_eq!(session.local_character().unwrap().health().current, 80);
    }

    fn pose_sample(tick: u64, yaw: f32) -> ReplicatedState {
        ReplicatedState {
            participant: HOST,
            tick,
            health: 100,
            dead: false,
            stamina: 100.0,
            left_grab: false,
            right_grab: false,
            left_indicator: None,
            right_indicator: None,
            look_enabled: true,
            active: true,
            rotations: vec![Quat::from_rotation_y(yaw); 4],
        }
    }

    #[test]
    fn observer_pose_blends_with_frame_time() {
        let mut guest_world = world();
        let mut guest = Session::observer(GUEST, ControllerConfig::default());
        let desc = build_rig(&mut guest_world, Vec3::new(0.0, 0.3, 0.0));
        guest.join(&guest_world, HOST, desc).unwrap();

        let from = Quat::from_rotation_y(0.0);
        let to = Quat::from_rotation_y(1.0);
        assert!(guest.receive_snapshot(pose_sample(1, 0.0)));
        assert!(guest.receive_snapshot(pose_sample(2, 1.0)));
        assert_eq!(guest.render_alpha(), 0.0);
        assert_eq!(guest.interpolated_pose(HOST)[0], from);

        // One and a half ticks of frame time: one tick runs, half a tick is left over.
        guest.advance_frame(Duration::from_secs_f64(1.5 / 60.0));
        assert!(guest.tick_due());
        assert!(guest.step_due(&mut guest_world).is_some());
        assert!(guest.step_due(&mut guest_world).is_none());
        assert_eq!(guest.time().tick_count(), 1);

        let alpha = guest.render_alpha();
        assert!(alpha > 0.45 && alpha < 0.55, "alpha {}", alpha);
        let blended = guest.interpolated_pose(HOST)[0];
        assert!(blended.angle_between(from) > 0.4);
        assert!(blended.angle_between(to) > 0.4);
        assert!(blended.angle_between(Quat::from_rotation_y(alpha)) < 1e-3);
    }

    #[test]
    fn observed_character_mirrors_authority_state() {
        let mut host_world = world();
        let mut host = Session::authority(GUEST, ControllerConfig::default());
        let desc = build_rig(&mut host_world, Vec3::new(0.0, 0.3, 0.0));
        let root = desc.root;
        let hand = desc.right_hand;
        host.join(&host_world, HOST, desc).unwrap();
        let at = host_world.pose(hand).unwrap().position + Vec3::new(0.0, 0.0, -0.25);
        host_world.add_body(BodyKind::Dynamic, 2.0, 0.15, at);

        // The input owner's peer only observes its own character.
        let mut owner_world = world();
        let mut owner = Session::observer(HOST, ControllerConfig::default());
        let owner_desc = build_rig(&mut owner_world, Vec3::new(0.0, 0.3, 0.0));
        owner.join(&owner_world, HOST, owner_desc).unwrap();

        host.submit_input(
            HOST,
            InputSample {
                right_grab: true,
                ..InputSample::default()
            },
        );
        run(&mut host, &mut host_world);
        for state in host.take_snapshots() {
            assert!(owner.receive_snapshot(state));
        }
        let mirror = owner.local_character().unwrap();
        let held = host.character(HOST).unwrap();
        assert!(mirror.hand(HandSide::Right).is_grabbing());
        assert_eq!(
            mirror.hand(HandSide::Right).indicator(),
            held.hand(HandSide::Right).indicator()
        );
        assert_eq!(mirror.stamina().current(), held.stamina().current());

        assert!(host.request_damage(&mut host_world, HOST, 100, Vec3::ZERO, root));
        run(&mut host, &mut host_world);
        for state in host.take_snapshots() {
            assert!(owner.receive_snapshot(state));
        }
        let mirror = owner.local_character().unwrap();
        assert!(mirror.is_dead());
        assert!(!mirror.is_active());
        assert!(!mirror.is_look_enabled());
        assert_eq!(mirror.health().current, 0);
        assert_eq!(mirror.health_fraction(), 0.0);
        assert_eq!(
            mirror.hand(HandSide::Right).is_grabbing(),
            host.character(HOST).unwrap().hand(HandSide::Right).is_grabbing()
        );
    }

    #[test]
    fn requests_between_ticks_use_the_session_clock() {
        let mut world = world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        session.join(&world, HOST, desc).unwrap();
        run(&mut session, &mut world);
        run(&mut session, &mut world);

        assert!(session.stagger(&mut world, HOST));
        let staggered_at = session.now();
        assert_eq!(session.local_character().unwrap().last_ragdoll_at(), staggered_at);

        // The next tick starts at `staggered_at`, so the cooldown spans 180 whole ticks.
        let recover = InputSample {
            recover: true,
            ..InputSample::default()
        };
        let mut stood_up_at = None;
        for _ in 0..200 {
            session.submit_input(HOST, recover);
            let events = run(&mut session, &mut world);
            if events.iter().any(|e| matches!(e, CharacterEvent::StoodUp { .. })) {
                stood_up_at = Some(session.time().tick_count());
                break;
            }
        }
        assert_eq!(stood_up_at, Some(2 + 181));
    }
}
