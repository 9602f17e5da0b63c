//! Burnable props: smoke, fire, spread between neighbours and damage to
//! characters standing too close.
//!
//! Burnables live in their own `hecs` world. Only the authority advances
//! them; observers read the replicated burn state.

use hecs::{Entity, World};

use crate::config::FireConfig;
use crate::session::Session;
use engine_core::{BodyId, Vec3};
use physics::PhysicsBackend;

/// Mass assumed for a burnable whose body reports none.
const DEFAULT_MASS: f32 = 5.0;
/// Shortest smoke or fire phase.
const MIN_PHASE_SECONDS: f32 = 0.01;

/// Something that can catch fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burnable {
    pub body: BodyId,
    pub smoke_duration: f32,
    pub fire_duration: f32,
    /// Burns away completely when the fire runs out.
    pub dissolvable: bool,
}

impl Burnable {
    /// Durations scale with mass; light things dissolve, heavy things char.
    pub fn from_mass(body: BodyId, mass: f32, config: &FireConfig) -> Self {
        let mass = mass.max(0.01);
        Self {
            body,
            smoke_duration: (mass * config.smoke_seconds_per_kg)
                .clamp(config.smoke_min, config.smoke_max),
            fire_duration: (mass * config.fire_seconds_per_kg).clamp(config.fire_min, config.fire_max),
            dissolvable: mass <= config.dissolvable_mass,
        }
    }

    pub fn manual(body: BodyId, smoke_duration: f32, fire_duration: f32, dissolvable: bool) -> Self {
        Self {
            body,
            smoke_duration: smoke_duration.max(MIN_PHASE_SECONDS),
            fire_duration: fire_duration.max(MIN_PHASE_SECONDS),
            dissolvable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurnState {
    Idle,
    Smoking { until: f64 },
    Burning { until: f64, next_damage_at: f64 },
    Dissolved,
}

impl BurnState {
    pub fn is_burning(&self) -> bool {
        matches!(self, BurnState::Burning { .. })
    }
}

pub struct FireManager {
    world: World,
    config: FireConfig,
}

impl FireManager {
    pub fn new(config: FireConfig) -> Self {
        Self {
            world: World::new(),
            config,
        }
    }

    /// Register a body with durations derived from its current mass.
    pub fn add_burnable(&mut self, physics: &dyn PhysicsBackend, body: BodyId) -> Entity {
        let mass = physics.mass(body).unwrap_or(DEFAULT_MASS);
        self.add(Burnable::from_mass(body, mass, &self.config))
    }

    pub fn add(&mut self, burnable: Burnable) -> Entity {
        log::debug!(
            "burnable {}: smoke {:.2}s, fire {:.2}s, dissolvable {}",
            burnable.body,
            burnable.smoke_duration,
            burnable.fire_duration,
            burnable.dissolvable
        );
        self.world.spawn((burnable, BurnState::Idle))
    }

    pub fn remove(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    pub fn state(&self, entity: Entity) -> Option<BurnState> {
        self.world.get::<&BurnState>(entity).ok().map(|s| *s)
    }

    pub fn find(&self, body: BodyId) -> Option<Entity> {
        self.world
            .query::<&Burnable>()
            .iter()
            .find(|(_, b)| b.body == body)
            .map(|(e, _)| e)
    }

    /// Start smoking. Burning or dissolved burnables are unaffected.
    pub fn ignite_smoke(&mut self, entity: Entity, now: f64) -> bool {
        let Ok((burnable, state)) = self
            .world
            .query_one_mut::<(&Burnable, &mut BurnState)>(entity)
        else {
            return false;
        };
        match *state {
            BurnState::Burning { .. } | BurnState::Dissolved => false,
            _ => {
                *state = BurnState::Smoking {
                    until: now + burnable.smoke_duration as f64,
                };
                true
            }
        }
    }

    /// Set on fire directly, skipping the smoke phase.
    pub fn ignite(&mut self, entity: Entity, now: f64) -> bool {
        let Ok((burnable, state)) = self
            .world
            .query_one_mut::<(&Burnable, &mut BurnState)>(entity)
        else {
            return false;
        };
        if *state == BurnState::Dissolved {
            return false;
        }
        *state = BurnState::Burning {
            until: now + burnable.fire_duration as f64,
            next_damage_at: now,
        };
        true
    }

    /// Put out smoke or fire without dissolving anything.
    pub fn stop_burning(&mut self, entity: Entity) -> bool {
        let Ok(mut state) = self.world.get::<&mut BurnState>(entity) else {
            return false;
        };
        let current = *state;
        match current {
            BurnState::Smoking { .. } | BurnState::Burning { .. } => {
                *state = BurnState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Advance every burnable by one tick. Returns the bodies that burned away.
    pub fn update(&mut self, session: &mut Session, physics: &mut dyn PhysicsBackend) -> Vec<BodyId> {
        if !session.is_authority() {
            return Vec::new();
        }
        let now = session.now();

        let mut dissolved = Vec::new();
        for (_, (burnable, state)) in self.world.query_mut::<(&Burnable, &mut BurnState)>() {
            match *state {
                BurnState::Smoking { until } if now >= until => {
                    *state = BurnState::Burning {
                        until: now + burnable.fire_duration as f64,
                        next_damage_at: now,
                    };
                }
                BurnState::Burning { until, .. } if burnable.dissolvable && now >= until => {
                    *state = BurnState::Dissolved;
                    dissolved.push(burnable.body);
                }
                _ => {}
            }
        }
        for body in &dissolved {
            log::info!("{} burned away", body);
            physics.remove_body(*body);
            session.forget_body(*body);
        }

        self.spread(&*physics, now);
        self.burn_characters(session, physics, now);
        dissolved
    }

    fn spread(&mut self, physics: &dyn PhysicsBackend, now: f64) {
        let burning: Vec<Vec3> = self
            .world
            .query::<(&Burnable, &BurnState)>()
            .iter()
            .filter(|(_, (_, state))| state.is_burning())
            .filter_map(|(_, (b, _))| physics.pose(b.body).map(|p| p.position))
            .collect();
        if burning.is_empty() {
            return;
        }

        let reach_sq = self.config.spread_distance * self.config.spread_distance;
        let catching: Vec<Entity> = self
            .world
            .query::<(&Burnable, &BurnState)>()
            .iter()
            .filter(|(_, (_, state))| **state == BurnState::Idle)
            .filter_map(|(entity, (b, _))| {
                let position = physics.pose(b.body)?.position;
                burning
                    .iter()
                    .any(|fire| fire.distance_squared(position) <= reach_sq)
                    .then_some(entity)
            })
            .collect();

        for entity in catching {
            self.ignite_smoke(entity, now);
        }
    }

    fn burn_characters(&mut self, session: &mut Session, physics: &mut dyn PhysicsBackend, now: f64) {
        let due: Vec<(Entity, Vec3)> = self
            .world
            .query::<(&Burnable, &BurnState)>()
            .iter()
            .filter_map(|(entity, (b, state))| match state {
                BurnState::Burning { next_damage_at, .. } if now >= *next_damage_at => {
                    physics.pose(b.body).map(|p| (entity, p.position))
                }
                _ => None,
            })
            .collect();
        if due.is_empty() {
            return;
        }

        let roots = session.character_roots();
        for (entity, position) in due {
            for (participant, root) in &roots {
                let Some(root_position) = physics.pose(*root).map(|p| p.position) else {
                    continue;
                };
                if root_position.distance(position) <= self.config.damage_radius {
                    session.request_damage(physics, *participant, self.config.damage, Vec3::ZERO, *root);
                }
            }
            if let Ok(mut state) = self.world.get::<&mut BurnState>(entity) {
                if let BurnState::Burning { next_damage_at, .. } = &mut *state {
                    *next_damage_at = now + self.config.damage_interval as f64;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::events::{CharacterEvent, HandSide, ReleaseReason};
    use crate::testing::build_rig;
    use engine_core::ParticipantId;
    use input::InputSample;
    use physics::{BodyKind, HeadlessWorld};

    const HOST: ParticipantId = ParticipantId(1);

    fn still_world() -> HeadlessWorld {
        let mut world = HeadlessWorld::new(1.0 / 60.0);
        world.gravity = Vec3::ZERO;
        world
    }

    fn run(session: &mut Session, fire: &mut FireManager, world: &mut HeadlessWorld) -> Vec<CharacterEvent> {
        let mut events = session.step(world);
        fire.update(session, world);
        events.extend(session.drain_events());
        world.step();
        events
    }

    #[test]
    fn durations_follow_mass() {
        let config = FireConfig::default();
        let crate_box = Burnable::from_mass(BodyId(1), 2.0, &config);
        assert_eq!(crate_box.smoke_duration, 1.0);
        assert_eq!(crate_box.fire_duration, 4.0);
        assert!(crate_box.dissolvable);

        let boulder = Burnable::from_mass(BodyId(2), 100.0, &config);
        assert_eq!(boulder.smoke_duration, 5.0);
        assert_eq!(boulder.fire_duration, 30.0);
        assert!(!boulder.dissolvable);

        let twig = Burnable::from_mass(BodyId(3), 0.1, &config);
        assert_eq!(twig.smoke_duration, 0.3);
        assert_eq!(twig.fire_duration, 3.0);
    }

    #[test]
    fn smoke_becomes_fire_then_dissolves() {
        let mut world = still_world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let body = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(0.0, 0.2, 0.0));
        let entity = fire.add_burnable(&world, body);
        assert!(fire.ignite_smoke(entity, 0.0));

        for _ in 0..90 {
            run(&mut session, &mut fire, &mut world);
        }
        assert!(fire.state(entity).is_some_and(|s| s.is_burning()));
        assert!(!fire.ignite_smoke(entity, session.now()));

        for _ in 0..300 {
            run(&mut session, &mut fire, &mut world);
        }
        assert_eq!(fire.state(entity), Some(BurnState::Dissolved));
        assert!(!world.body_exists(body));
        assert!(!fire.ignite(entity, session.now()));
    }

    #[test]
    fn fire_spreads_to_close_neighbours_only() {
        let mut world = still_world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let a = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(0.0, 0.2, 0.0));
        let b = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(0.5, 0.2, 0.0));
        let c = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(2.0, 0.2, 0.0));
        let a = fire.add_burnable(&world, a);
        let b = fire.add_burnable(&world, b);
        let c = fire.add_burnable(&world, c);
        fire.ignite(a, 0.0);

        run(&mut session, &mut fire, &mut world);
        assert!(matches!(fire.state(b), Some(BurnState::Smoking { .. })));
        assert_eq!(fire.state(c), Some(BurnState::Idle));
        assert_eq!(fire.find(world_body(&fire, c)), Some(c));
    }

    fn world_body(fire: &FireManager, entity: Entity) -> BodyId {
        fire.world
            .get::<&Burnable>(entity)
            .map(|b| b.body)
            .unwrap()
    }

    #[test]
    fn stop_burning_extinguishes_without_dissolving() {
        let mut world = still_world();
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let body = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(0.0, 0.2, 0.0));
        let entity = fire.add(Burnable::manual(body, 0.1, 0.1, true));

        fire.ignite(entity, 0.0);
        assert!(fire.stop_burning(entity));
        assert!(!fire.stop_burning(entity));
        for _ in 0..30 {
            run(&mut session, &mut fire, &mut world);
        }
        assert_eq!(fire.state(entity), Some(BurnState::Idle));
        assert!(world.body_exists(body));
    }

    #[test]
    fn observers_do_not_simulate_fire() {
        let mut world = still_world();
        let mut session = Session::observer(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let body = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::new(0.0, 0.2, 0.0));
        let entity = fire.add(Burnable::manual(body, 0.1, 0.1, true));
        fire.ignite(entity, 0.0);

        for _ in 0..30 {
            run(&mut session, &mut fire, &mut world);
        }
        assert!(fire.state(entity).is_some_and(|s| s.is_burning()));
        assert!(world.body_exists(body));
    }

    #[test]
    fn standing_in_fire_hurts_at_a_fixed_cadence() {
        let mut world = HeadlessWorld::new(1.0 / 60.0);
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        session.join(&world, HOST, desc).unwrap();
        let bonfire = world.add_body(BodyKind::Fixed, 100.0, 0.3, Vec3::new(0.8, 0.3, 0.0));
        let entity = fire.add(Burnable::manual(bonfire, 1.0, 100.0, false));
        fire.ignite(entity, 0.0);

        for _ in 0..60 {
            run(&mut session, &mut fire, &mut world);
        }
        assert_eq!(session.local_character().unwrap().health().current, 90);
    }

    #[test]
    fn held_prop_burning_away_releases_the_hand() {
        let mut world = HeadlessWorld::new(1.0 / 60.0);
        let mut session = Session::authority(HOST, ControllerConfig::default());
        let mut fire = FireManager::new(FireConfig::default());
        let desc = build_rig(&mut world, Vec3::new(0.0, 0.3, 0.0));
        let hand = desc.right_hand;
        session.join(&world, HOST, desc).unwrap();
        let at = world.pose(hand).unwrap().position + Vec3::new(0.0, 0.0, -0.25);
        let prop = world.add_body(BodyKind::Dynamic, 2.0, 0.15, at);
        let entity = fire.add(Burnable::manual(prop, 0.1, 0.1, true));

        let grab = InputSample {
            right_grab: true,
            ..InputSample::default()
        };
        session.submit_input(HOST, grab);
        run(&mut session, &mut fire, &mut world);
        assert_eq!(session.local_character().unwrap().held_body(HandSide::Right), Some(prop));

        fire.ignite(entity, session.now());
        let mut events = Vec::new();
        for _ in 0..12 {
            session.submit_input(HOST, grab);
            events.extend(run(&mut session, &mut fire, &mut world));
        }

        assert!(!world.body_exists(prop));
        let character = session.local_character().unwrap();
        assert_eq!(character.held_body(HandSide::Right), None);
        assert_eq!(character.health().current, 95);
        assert!(session.registry().is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            CharacterEvent::GrabReleased {
                reason: ReleaseReason::BodyRemoved,
                ..
            }
        )));
    }
}
