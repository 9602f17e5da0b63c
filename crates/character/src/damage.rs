//! Health, damage and death, plus impact damage from hazard contacts.

use crate::config::ImpactConfig;
use crate::controller::{Character, TickContext};
use crate::events::{CharacterEvent, FadeDirection};
use engine_core::{BodyId, Vec3};

/// Damage dealt by a hazard contact of the given impulse per second, if any.
pub fn impact_damage(config: &ImpactConfig, magnitude: f32) -> Option<i32> {
    if magnitude < config.threshold {
        return None;
    }
    let span = (config.saturation - config.threshold).max(f32::EPSILON);
    let t = ((magnitude - config.threshold) / span).clamp(0.0, 1.0);
    let damage = config.min_damage + (config.max_damage - config.min_damage) * t;
    Some(damage.round() as i32)
}

/// Knock-back for a hazard contact, clamped to the configured maximum.
pub fn impact_knockback(config: &ImpactConfig, impulse: Vec3) -> Vec3 {
    ((impulse + Vec3::Y) * 0.5).clamp_length_max(config.max_knockback)
}

impl Character {
    /// Damage entry point.
    ///
    /// Applies `impulse` to the struck `part` and subtracts `amount` from
    /// health. The first time health reaches zero the character dies, goes
    /// limp and its owner is told to fade out. Does nothing on observers or
    /// when already dead.
    pub fn apply_damage(
        &mut self,
        ctx: &mut TickContext<'_>,
        amount: i32,
        impulse: Vec3,
        part: BodyId,
    ) -> bool {
        if self.dead || !self.authority {
            return false;
        }

        if ctx.physics.body_exists(part) {
            ctx.physics.apply_impulse(part, impulse);
        }
        let removed = self.health.take_damage(amount);
        ctx.events.push(CharacterEvent::Damaged {
            participant: self.participant,
            amount: removed,
            remaining: self.health.current,
        });

        if self.health.is_depleted() {
            self.dead = true;
            log::info!("{} died", self.participant);
            self.make_ragdoll(ctx);
            ctx.events.push(CharacterEvent::Died {
                participant: self.participant,
            });
            ctx.events.push(CharacterEvent::Fade {
                to: self.participant,
                direction: FadeDirection::In,
            });
        }
        true
    }

    /// Damage from hard hits by hazard bodies against any tracked part.
    pub(crate) fn detect_impacts(&mut self, ctx: &mut TickContext<'_>) {
        if !self.active || self.dead || ctx.hazards.is_empty() {
            return;
        }
        let root = self.root();
        let dt = ctx.tick.dt.max(f32::EPSILON);
        let config = &ctx.config.impact;

        let mut hits = Vec::new();
        for part in self.rig.bodies() {
            for contact in ctx.physics.contacts(part) {
                let is_hazard = contact.other.is_some_and(|b| ctx.hazards.contains(&b))
                    || contact.other_root.is_some_and(|r| ctx.hazards.contains(&r));
                if !is_hazard || contact.other_root == Some(root) {
                    continue;
                }
                if let Some(damage) = impact_damage(config, contact.impulse.length() / dt) {
                    hits.push((damage, impact_knockback(config, contact.impulse), part));
                }
            }
        }

        for (damage, knockback, part) in hits {
            log::debug!("{} hit by hazard for {}", self.participant, damage);
            if !self.apply_damage(ctx, damage, knockback, part) {
                break;
            }
        }
    }
}
