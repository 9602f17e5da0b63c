//! Shared bookkeeping of grabbed bodies and their original masses.
//!
//! Every hand of every character goes through one registry, owned by the
//! session and only touched from the authority's tick, so grab counts and
//! mass restores never interleave.

use std::collections::HashMap;

use crate::config::GrabConfig;
use engine_core::BodyId;
use physics::{BodyKind, PhysicsBackend};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassEntry {
    pub original_mass: f32,
    pub grab_count: u32,
    /// Whether the live mass was lowered when the first hand grabbed.
    pub overridden: bool,
}

#[derive(Debug, Default)]
pub struct MassRegistry {
    entries: HashMap<BodyId, MassEntry>,
}

impl MassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more hand holding `body`. Returns whether this call lowered its mass.
    pub fn acquire(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        body: BodyId,
        config: &GrabConfig,
    ) -> bool {
        if let Some(entry) = self.entries.get_mut(&body) {
            entry.grab_count += 1;
            return false;
        }

        let original_mass = physics.mass(body).unwrap_or(0.0);
        let liftable = physics.body_kind(body) == Some(BodyKind::Dynamic)
            && original_mass > 0.0
            && original_mass < config.liftable_mass;
        if liftable {
            let live = (original_mass * config.mass_scale)
                .max(config.mass_floor)
                .min(original_mass);
            physics.set_mass(body, live);
            log::debug!("{} made lighter: {} -> {} kg", body, original_mass, live);
        }

        self.entries.insert(
            body,
            MassEntry {
                original_mass,
                grab_count: 1,
                overridden: liftable,
            },
        );
        liftable
    }

    /// Drop one hand's hold on `body`, restoring its mass when nobody holds it anymore.
    pub fn release(&mut self, physics: &mut dyn PhysicsBackend, body: BodyId) {
        let Some(entry) = self.entries.get_mut(&body) else {
            return;
        };
        entry.grab_count = entry.grab_count.saturating_sub(1);
        if entry.grab_count > 0 {
            return;
        }
        if entry.overridden {
            physics.set_mass(body, entry.original_mass);
        }
        self.entries.remove(&body);
    }

    pub fn entry(&self, body: BodyId) -> Option<&MassEntry> {
        self.entries.get(&body)
    }

    pub fn grab_count(&self, body: BodyId) -> u32 {
        self.entries.get(&body).map_or(0, |e| e.grab_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Vec3;
    use physics::HeadlessWorld;

    #[test]
    fn light_body_is_scaled_and_floored_then_restored() {
        let mut world = HeadlessWorld::default();
        let config = GrabConfig::default();
        let body = world.add_body(BodyKind::Dynamic, 2.0, 0.2, Vec3::Y);
        let mut registry = MassRegistry::new();

        assert!(registry.acquire(&mut world, body, &config));
        assert_eq!(registry.entry(body).unwrap().original_mass, 2.0);
        assert_eq!(world.mass(body), Some(0.5));

        registry.release(&mut world, body);
        assert_eq!(world.mass(body), Some(2.0));
        assert!(registry.is_empty());
    }

    #[test]
    fn two_hands_share_one_entry() {
        let mut world = HeadlessWorld::default();
        let config = GrabConfig::default();
        let body = world.add_body(BodyKind::Dynamic, 20.0, 0.4, Vec3::Y);
        let mut registry = MassRegistry::new();

        assert!(registry.acquire(&mut world, body, &config));
        assert!(!registry.acquire(&mut world, body, &config));
        assert_eq!(registry.grab_count(body), 2);
        assert_eq!(world.mass(body), Some(2.0));

        registry.release(&mut world, body);
        assert_eq!(world.mass(body), Some(2.0));
        registry.release(&mut world, body);
        assert_eq!(world.mass(body), Some(20.0));
        assert_eq!(registry.grab_count(body), 0);
    }

    #[test]
    fn heavy_and_kinematic_bodies_keep_their_mass() {
        let mut world = HeadlessWorld::default();
        let config = GrabConfig::default();
        let boulder = world.add_body(BodyKind::Dynamic, 80.0, 1.0, Vec3::Y);
        let wall = world.add_body(BodyKind::Kinematic, 10.0, 1.0, Vec3::X * 5.0);
        let mut registry = MassRegistry::new();

        assert!(!registry.acquire(&mut world, boulder, &config));
        assert!(!registry.acquire(&mut world, wall, &config));
        assert_eq!(world.mass(boulder), Some(80.0));
        assert_eq!(world.mass(wall), Some(10.0));

        registry.release(&mut world, boulder);
        registry.release(&mut world, wall);
        assert_eq!(world.mass(boulder), Some(80.0));
        assert!(registry.is_empty());
    }

    #[test]
    fn release_of_unknown_body_is_ignored() {
        let mut world = HeadlessWorld::default();
        let mut registry = MassRegistry::new();
        registry.release(&mut world, BodyId(42));
        assert!(registry.is_empty());
    }
}
