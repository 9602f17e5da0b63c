//! Test fixtures: a single character on a headless world.

use std::collections::BTreeSet;

use crate::config::ControllerConfig;
use crate::controller::{Character, TickContext};
use crate::events::{CharacterEvent, HandSide};
use crate::mass_registry::MassRegistry;
use engine_core::{BodyId, ParticipantId, Tick, Vec3};
use input::InputSample;
use physics::{BodyKind, HeadlessWorld, PhysicsBackend, RagdollRig, RigDesc, RigPart};

pub(crate) const DT: f32 = 1.0 / 60.0;

/// Build a five-part rig around `at`: torso root, head and two hands that
/// follow the torso, with a main drive and a head drive.
pub(crate) fn build_rig(world: &mut HeadlessWorld, at: Vec3) -> RigDesc {
    let root = world.add_body(BodyKind::Dynamic, 40.0, 0.3, at);
    let head = world.add_body(BodyKind::Dynamic, 4.0, 0.15, at + Vec3::new(0.0, 0.5, 0.0));
    let left = world.add_body(BodyKind::Dynamic, 1.0, 0.1, at + Vec3::new(-0.4, 0.2, -0.3));
    let right = world.add_body(BodyKind::Dynamic, 1.0, 0.1, at + Vec3::new(0.4, 0.2, -0.3));
    for part in [head, left, right] {
        world.set_root(part, root);
        world.attach(part, root);
    }
    let main = world.add_drive(800.0);
    let neck = world.add_drive(200.0);

    RigDesc {
        root,
        main_drive: main,
        head_drive: Some(neck),
        left_hand: left,
        right_hand: right,
        parts: vec![
            RigPart {
                name: "torso".into(),
                body: root,
                parent: None,
                drive: Some(main),
            },
            RigPart {
                name: "head".into(),
                body: head,
                parent: Some(root),
                drive: Some(neck),
            },
            RigPart {
                name: "left_hand".into(),
                body: left,
                parent: Some(root),
                drive: None,
            },
            RigPart {
                name: "right_hand".into(),
                body: right,
                parent: Some(root),
                drive: None,
            },
        ],
    }
}

pub(crate) struct Harness {
    pub world: HeadlessWorld,
    pub registry: MassRegistry,
    pub config: ControllerConfig,
    pub hazards: BTreeSet<BodyId>,
    pub limp: BTreeSet<BodyId>,
    pub events: Vec<CharacterEvent>,
    pub character: Character,
    pub now: f64,
    pub index: u64,
}

impl Harness {
    /// Character standing on the ground plane.
    pub fn grounded() -> Self {
        Self::spawn(Some(0.0), Vec3::new(0.0, 0.3, 0.0))
    }

    /// Character in mid-air with no ground anywhere.
    pub fn airborne() -> Self {
        Self::spawn(None, Vec3::new(0.0, 5.0, 0.0))
    }

    fn spawn(ground: Option<f32>, at: Vec3) -> Self {
        let mut world = HeadlessWorld::new(DT);
        world.ground_height = ground;
        let desc = build_rig(&mut world, at);
        let config = ControllerConfig::default();
        let rig = RagdollRig::capture(&world, desc).expect("valid rig");
        let character = Character::new(ParticipantId(1), rig, &config, true);
        Self {
            world,
            registry: MassRegistry::new(),
            config,
            hazards: BTreeSet::new(),
            limp: BTreeSet::new(),
            events: Vec::new(),
            character,
            now: 0.0,
            index: 0,
        }
    }

    /// Run one controller tick followed by one physics step.
    pub fn tick(&mut self, input: &InputSample) {
        self.index += 1;
        let tick = Tick {
            index: self.index,
            dt: DT,
            now: self.now,
        };
        let mut ctx = TickContext {
            physics: &mut self.world,
            registry: &mut self.registry,
            config: &self.config,
            hazards: &self.hazards,
            ragdolled_roots: &self.limp,
            events: &mut self.events,
            tick,
        };
        self.character.tick(&mut ctx, input);
        self.world.step();
        self.now += DT as f64;
    }

    /// Call into the character at an explicit simulation time without stepping.
    pub fn at<R>(&mut self, now: f64, f: impl FnOnce(&mut Character, &mut TickContext<'_>) -> R) -> R {
        let tick = Tick {
            index: self.index,
            dt: DT,
            now,
        };
        let mut ctx = TickContext {
            physics: &mut self.world,
            registry: &mut self.registry,
            config: &self.config,
            hazards: &self.hazards,
            ragdolled_roots: &self.limp,
            events: &mut self.events,
            tick,
        };
        f(&mut self.character, &mut ctx)
    }

    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn events_matching(&self, pred: impl Fn(&CharacterEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// A kinematic body in front of the chest that both hands touch.
    pub fn add_wall_in_front(&mut self) -> BodyId {
        let root = self.world.pose(self.character.root()).map(|p| p.position).unwrap_or_default();
        self.world
            .add_body(BodyKind::Kinematic, 1000.0, 0.55, root + Vec3::new(0.0, 0.2, -0.8))
    }

    /// A loose prop just in front of one hand.
    pub fn add_prop_at_hand(&mut self, side: HandSide, mass: f32) -> BodyId {
        let hand = self.character.hand(side).body();
        let at = self.world.pose(hand).map(|p| p.position).unwrap_or_default();
        self.world
            .add_body(BodyKind::Dynamic, mass, 0.15, at + Vec3::new(0.0, 0.0, -0.25))
    }
}
