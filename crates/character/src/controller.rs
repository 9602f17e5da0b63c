//! The character controller: one per connected participant.
//!
//! A character owns its rig, health, stamina and both hands, and is advanced
//! once per fixed tick by whichever peer has authority over it. The per-tick
//! order is fixed: ground probe, stamina, stand-up, look, movement, jump,
//! hands, impacts and fall-out. Jump must run before the hands because the
//! wall-jump branch reads this tick's latch state.
//!
//! Movement and look live in `movement.rs`, the ragdoll state machine in
//! `ragdoll.rs` and damage in `damage.rs`.

use std::collections::BTreeSet;

use crate::config::ControllerConfig;
use crate::events::{CharacterEvent, HandSide, ReleaseReason};
use crate::hand::{GrabGate, GrabHand, HandContext};
use crate::mass_registry::MassRegistry;
use crate::replication::ReplicatedState;
use crate::stamina::{Stamina, StaminaTick};
use engine_core::{BodyId, ConstraintId, Health, ParticipantId, Quat, Tick, Vec3};
use input::InputSample;
use physics::{PhysicsBackend, RagdollRig};

/// Everything shared across characters during one tick.
pub struct TickContext<'a> {
    pub physics: &'a mut dyn PhysicsBackend,
    pub registry: &'a mut MassRegistry,
    pub config: &'a ControllerConfig,
    /// Bodies that deal impact damage.
    pub hazards: &'a BTreeSet<BodyId>,
    /// Roots of characters that were limp at the start of the tick.
    pub ragdolled_roots: &'a BTreeSet<BodyId>,
    pub events: &'a mut Vec<CharacterEvent>,
    pub tick: Tick,
}

impl TickContext<'_> {
    pub(crate) fn hand_context(&mut self, participant: ParticipantId, forward: Vec3) -> HandContext<'_> {
        HandContext {
            physics: &mut *self.physics,
            registry: &mut *self.registry,
            config: &self.config.grab,
            events: &mut *self.events,
            ragdolled_roots: self.ragdolled_roots,
            participant,
            forward,
            now: self.tick.now,
        }
    }
}

/// Simulation state of one participant's ragdoll character.
#[derive(Debug, Clone)]
pub struct Character {
    pub(crate) participant: ParticipantId,
    pub(crate) rig: RagdollRig,
    pub(crate) authority: bool,
    pub(crate) health: Health,
    pub(crate) dead: bool,
    pub(crate) active: bool,
    pub(crate) look_enabled: bool,
    pub(crate) yaw_deg: f32,
    pub(crate) pitch_deg: f32,
    /// Facing used for movement and tossing, as reported by the input owner.
    pub(crate) aim_yaw_deg: f32,
    pub(crate) stamina: Stamina,
    pub(crate) left: GrabHand,
    pub(crate) right: GrabHand,
    pub(crate) last_ragdoll_at: f64,
    pub(crate) grounded: bool,
    pub(crate) last_grounded_at: f64,
    /// Horizontal speed at the instant the character last left the ground.
    pub(crate) takeoff_speed: f32,
}

impl Character {
    /// Spawn a character at full health and stamina.
    pub fn new(
        participant: ParticipantId,
        rig: RagdollRig,
        config: &ControllerConfig,
        authority: bool,
    ) -> Self {
        let left = GrabHand::new(HandSide::Left, rig.desc().left_hand);
        let right = GrabHand::new(HandSide::Right, rig.desc().right_hand);
        Self {
            participant,
            rig,
            authority,
            health: Health::new(config.health.max),
            dead: false,
            active: true,
            look_enabled: true,
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            aim_yaw_deg: 0.0,
            stamina: Stamina::new(&config.stamina),
            left,
            right,
            last_ragdoll_at: f64::NEG_INFINITY,
            grounded: false,
            last_grounded_at: f64::NEG_INFINITY,
            takeoff_speed: 0.0,
        }
    }

    /// Advance one fixed tick with this tick's input.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, input: &InputSample) {
        if !self.authority {
            return;
        }
        let now = ctx.tick.now;
        let root = self.root();

        let was_grounded = self.grounded;
        self.grounded = self.probe_ground(&*ctx.physics, ctx.config);
        if self.grounded {
            self.last_grounded_at = now;
        } else if was_grounded {
            self.takeoff_speed =
                engine_core::horizontal(ctx.physics.linear_velocity(root)).length();
        }

        let hanging = !self.grounded
            && (self.left.is_latched_to_immovable(&*ctx.physics)
                || self.right.is_latched_to_immovable(&*ctx.physics));
        let exhausted = self.stamina.update(
            &ctx.config.stamina,
            StaminaTick {
                now,
                dt: ctx.tick.dt,
                grounded: self.grounded,
                sprint_held: input.sprint,
                moving: input.has_movement(),
                hanging,
            },
        );
        if exhausted {
            log::debug!("{} ran out of stamina while hanging", self.participant);
            self.release_hands(ctx, ReleaseReason::Exhausted);
        }

        if !self.active && input.recover {
            self.try_stand_up(ctx);
        }

        if self.active && !self.dead {
            self.aim_yaw_deg = input.aim_yaw_deg;
            if self.look_enabled {
                self.update_look(ctx, input);
            }
            self.apply_movement(ctx, input);
            if input.jump {
                self.try_jump(ctx);
            }
        }

        self.update_hands(ctx, input);
        self.detect_impacts(ctx);
        self.check_fall_out(ctx);
    }

    fn update_hands(&mut self, ctx: &mut TickContext<'_>, input: &InputSample) {
        let gate = GrabGate {
            authority: self.authority,
            active: self.active && !self.dead,
            has_stamina: !self.stamina.is_empty(),
            own_root: self.root(),
        };
        let forward = self.facing_forward();
        let mut hands = ctx.hand_context(self.participant, forward);
        self.left.update(&mut hands, gate, input.left_grab);
        self.right.update(&mut hands, gate, input.right_grab);
    }

    /// Release both hands without tossing.
    pub(crate) fn release_hands(&mut self, ctx: &mut TickContext<'_>, reason: ReleaseReason) {
        let forward = self.facing_forward();
        let mut hands = ctx.hand_context(self.participant, forward);
        self.left.release(&mut hands, reason, false);
        self.right.release(&mut hands, reason, false);
    }

    /// Route a snapped constraint to the hand that owned it.
    pub fn handle_broken_constraint(&mut self, ctx: &mut TickContext<'_>, id: ConstraintId) -> bool {
        let forward = self.facing_forward();
        let mut hands = ctx.hand_context(self.participant, forward);
        self.left.handle_broken(&mut hands, id) || self.right.handle_broken(&mut hands, id)
    }

    /// Snapshot of everything observers need, written at the end of a tick.
    pub fn replicated_state(&self, physics: &dyn PhysicsBackend, tick: u64) -> ReplicatedState {
        ReplicatedState {
            participant: self.participant,
            tick,
            health: self.health.current,
            dead: self.dead,
            stamina: self.stamina.current(),
            left_grab: self.left.is_grabbing(),
            right_grab: self.right.is_grabbing(),
            left_indicator: self.left.indicator(),
            right_indicator: self.right.indicator(),
            look_enabled: self.look_enabled,
            active: self.active,
            rotations: self.rig.sample_local_rotations(physics),
        }
    }

    /// Mirror a sample from the authority onto a character this peer does not
    /// simulate. Characters with authority ignore it.
    pub fn apply_replicated(&mut self, state: &ReplicatedState) {
        if self.authority {
            return;
        }
        self.health.set(state.health);
        self.dead = state.dead;
        self.active = state.active;
        self.look_enabled = state.look_enabled;
        self.stamina.set_current(state.stamina);
        self.left.apply_replicated(state.left_grab, state.left_indicator);
        self.right.apply_replicated(state.right_grab, state.right_indicator);
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn root(&self) -> BodyId {
        self.rig.root()
    }

    pub fn rig(&self) -> &RagdollRig {
        &self.rig
    }

    pub fn has_authority(&self) -> bool {
        self.authority
    }

    pub fn set_authority(&mut self, authority: bool) {
        self.authority = authority;
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn health_fraction(&self) -> f32 {
        self.health.fraction()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// `true` while the character takes directed input, `false` while limp.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_look_enabled(&self) -> bool {
        self.look_enabled
    }

    pub fn stamina(&self) -> &Stamina {
        &self.stamina
    }

    pub fn stamina_fraction(&self) -> f32 {
        self.stamina.fraction()
    }

    pub fn is_sprinting(&self) -> bool {
        self.stamina.is_sprinting()
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn takeoff_speed(&self) -> f32 {
        self.takeoff_speed
    }

    pub fn hand(&self, side: HandSide) -> &GrabHand {
        match side {
            HandSide::Left => &self.left,
            HandSide::Right => &self.right,
        }
    }

    /// Body held by one hand, if any.
    pub fn held_body(&self, side: HandSide) -> Option<BodyId> {
        self.hand(side).held_body()
    }

    pub fn is_latched_to_immovable(&self, side: HandSide, physics: &dyn PhysicsBackend) -> bool {
        self.hand(side).is_latched_to_immovable(physics)
    }

    pub fn look_yaw_deg(&self) -> f32 {
        self.yaw_deg
    }

    pub fn look_pitch_deg(&self) -> f32 {
        self.pitch_deg
    }

    /// Orientation for a camera following this character's look.
    pub fn camera_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw_deg.to_radians())
            * Quat::from_rotation_x(self.pitch_deg.to_radians())
    }

    /// Horizontal facing derived from the input owner's aim yaw.
    pub fn facing_forward(&self) -> Vec3 {
        Quat::from_rotation_y(self.aim_yaw_deg.to_radians()) * Vec3::NEG_Z
    }

    pub fn last_ragdoll_at(&self) -> f64 {
        self.last_ragdoll_at
    }
}
