//! Active/limp state machine.
//!
//! `Active` drives the rig's joints toward look targets; `Ragdoll` zeroes
//! every drive spring so the body is purely physical. Death is an orthogonal
//! flag that forces the limp state until a recover input revives.

use crate::controller::{Character, TickContext};
use crate::events::{CharacterEvent, FadeDirection, ReleaseReason};

impl Character {
    /// Go limp. Does nothing if already limp.
    pub fn make_ragdoll(&mut self, ctx: &mut TickContext<'_>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.look_enabled = false;
        self.last_ragdoll_at = ctx.tick.now;
        self.rig.go_limp(ctx.physics);
        self.release_hands(ctx, ReleaseReason::Ragdoll);

        log::info!("{} went limp", self.participant);
        ctx.events.push(CharacterEvent::BecameRagdoll {
            participant: self.participant,
        });
        true
    }

    /// Stand back up once the cooldown since going limp has elapsed.
    ///
    /// A dead character is revived at a fraction of its maximum health.
    pub fn try_stand_up(&mut self, ctx: &mut TickContext<'_>) -> bool {
        if self.active {
            return false;
        }
        let cooldown = ctx.config.ragdoll.stand_up_cooldown as f64;
        if ctx.tick.now - self.last_ragdoll_at < cooldown {
            return false;
        }

        self.rig.restore_drives(ctx.physics);
        self.active = true;
        self.look_enabled = true;

        let revived = self.dead;
        if revived {
            let health = &ctx.config.health;
            self.health
                .set((health.max as f32 * health.revive_fraction).round() as i32);
            self.dead = false;
            self.stamina.reset();
            ctx.events.push(CharacterEvent::Fade {
                to: self.participant,
                direction: FadeDirection::Out,
            });
            log::info!(
                "{} revived with {} health",
                self.participant,
                self.health.current
            );
        } else {
            log::info!("{} stood up", self.participant);
        }

        ctx.events.push(CharacterEvent::StoodUp {
            participant: self.participant,
            revived,
        });
        true
    }
}
