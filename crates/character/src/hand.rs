//! Grab hands.
//!
//! Each character has two independent hands. A hand latches onto whatever it
//! touches while its grab intent is held, through a breakable point
//! constraint anchored at the contact point, and lets go when the intent goes
//! away, when the constraint snaps or when the held body disappears.

use std::collections::BTreeSet;

use crate::config::GrabConfig;
use crate::events::{CharacterEvent, HandSide, ReleaseReason};
use crate::mass_registry::MassRegistry;
use engine_core::{BodyId, ConstraintId, ParticipantId, Vec3};
use physics::{BodyKind, PhysicsBackend, PointConstraint};

/// Indicator moves smaller than this are not reported.
const INDICATOR_EPSILON: f32 = 1e-3;

/// Shared state a hand needs while updating.
pub struct HandContext<'a> {
    pub physics: &'a mut dyn PhysicsBackend,
    pub registry: &'a mut MassRegistry,
    pub config: &'a GrabConfig,
    pub events: &'a mut Vec<CharacterEvent>,
    /// Roots of characters that are currently limp.
    pub ragdolled_roots: &'a BTreeSet<BodyId>,
    pub participant: ParticipantId,
    /// Character facing, used as the toss direction.
    pub forward: Vec3,
    pub now: f64,
}

/// Conditions owned by the character that gate a new grab.
#[derive(Debug, Clone, Copy)]
pub struct GrabGate {
    pub authority: bool,
    pub active: bool,
    pub has_stamina: bool,
    pub own_root: BodyId,
}

/// An active grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latch {
    pub body: BodyId,
    pub constraint: ConstraintId,
    /// Contact point in the hand's local space.
    pub hand_anchor: Vec3,
    /// Contact point in the held body's local space.
    pub body_anchor: Vec3,
    /// This hand lowered the body's mass when it grabbed.
    pub mass_override: bool,
}

#[derive(Debug, Clone)]
pub struct GrabHand {
    side: HandSide,
    body: BodyId,
    latch: Option<Latch>,
    next_grab_at: f64,
    grabbing: bool,
    indicator: Option<Vec3>,
}

impl GrabHand {
    pub fn new(side: HandSide, body: BodyId) -> Self {
        Self {
            side,
            body,
            latch: None,
            next_grab_at: f64::NEG_INFINITY,
            grabbing: false,
            indicator: None,
        }
    }

    pub fn side(&self) -> HandSide {
        self.side
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn latch(&self) -> Option<&Latch> {
        self.latch.as_ref()
    }

    /// The body this hand currently holds.
    pub fn held_body(&self) -> Option<BodyId> {
        self.latch.map(|l| l.body)
    }

    pub fn is_latched(&self) -> bool {
        self.latch.is_some()
    }

    /// Visual "grabbing" signal, true while the intent is held.
    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    /// World position of the held contact point, for remote visualization.
    pub fn indicator(&self) -> Option<Vec3> {
        self.indicator
    }

    /// Grab signal and indicator as replicated by the authority.
    pub fn apply_replicated(&mut self, grabbing: bool, indicator: Option<Vec3>) {
        self.grabbing = grabbing;
        self.indicator = indicator;
    }

    pub fn next_grab_at(&self) -> f64 {
        self.next_grab_at
    }

    /// Whether the hand holds a kinematic or fixed body.
    pub fn is_latched_to_immovable(&self, physics: &dyn PhysicsBackend) -> bool {
        self.latch.is_some_and(|l| physics.is_immovable(l.body))
    }

    /// Per-tick update driven by this hand's grab intent.
    pub fn update(&mut self, ctx: &mut HandContext<'_>, gate: GrabGate, intent: bool) {
        if intent != self.grabbing {
            self.grabbing = intent;
            ctx.events.push(CharacterEvent::GrabbingSignal {
                participant: ctx.participant,
                hand: self.side,
                grabbing: intent,
            });
        }

        if !intent {
            self.release(ctx, ReleaseReason::Let, true);
            return;
        }

        if let Some(latch) = self.latch {
            match ctx.physics.pose(latch.body) {
                Some(pose) => {
                    let point = pose.transform_point(latch.body_anchor);
                    let moved = self
                        .indicator
                        .map_or(true, |old| old.distance(point) > INDICATOR_EPSILON);
                    self.indicator = Some(point);
                    if moved {
                        ctx.events.push(CharacterEvent::GrabIndicatorMoved {
                            participant: ctx.participant,
                            hand: self.side,
                            position: point,
                        });
                    }
                }
                None => self.release(ctx, ReleaseReason::BodyRemoved, false),
            }
            return;
        }

        self.try_grab(ctx, gate);
    }

    /// Latch onto the first qualifying body touching the hand. Returns whether a latch was made.
    pub fn try_grab(&mut self, ctx: &mut HandContext<'_>, gate: GrabGate) -> bool {
        if !gate.authority
            || !gate.active
            || !gate.has_stamina
            || self.latch.is_some()
            || ctx.now < self.next_grab_at
        {
            return false;
        }
        let Some(hand_pose) = ctx.physics.pose(self.body) else {
            return false;
        };

        for contact in ctx.physics.contacts(self.body) {
            let Some(target) = contact.other else {
                continue;
            };
            if target == gate.own_root || contact.other_root == Some(gate.own_root) {
                continue;
            }
            // Static level geometry has no rigid body to hold on to.
            if ctx.physics.body_kind(target) == Some(BodyKind::Fixed) {
                continue;
            }
            let Some(target_pose) = ctx.physics.pose(target) else {
                continue;
            };

            let constraint = PointConstraint {
                hand: self.body,
                target,
                hand_anchor: hand_pose.inverse_transform_point(contact.point),
                target_anchor: target_pose.inverse_transform_point(contact.point),
                break_force: ctx.config.break_force,
                break_torque: ctx.config.break_torque,
            };
            let Some(id) = ctx.physics.create_point_constraint(&constraint) else {
                continue;
            };

            let mass_override = ctx.registry.acquire(ctx.physics, target, ctx.config);
            self.latch = Some(Latch {
                body: target,
                constraint: id,
                hand_anchor: constraint.hand_anchor,
                body_anchor: constraint.target_anchor,
                mass_override,
            });
            self.indicator = Some(contact.point);

            let immovable = ctx.physics.is_immovable(target);
            log::debug!(
                "{} {:?} hand grabbed {} (immovable: {})",
                ctx.participant,
                self.side,
                target,
                immovable
            );
            ctx.events.push(CharacterEvent::GrabStarted {
                participant: ctx.participant,
                hand: self.side,
                body: target,
                immovable,
            });
            return true;
        }
        false
    }

    /// Let go of the held body, optionally tossing it along the facing.
    ///
    /// Releasing an empty hand does nothing.
    pub fn release(&mut self, ctx: &mut HandContext<'_>, reason: ReleaseReason, toss: bool) {
        let Some(latch) = self.latch.take() else {
            return;
        };
        ctx.physics.destroy_constraint(latch.constraint);

        if toss && ctx.physics.body_kind(latch.body) == Some(BodyKind::Dynamic) {
            let limp_owner = ctx
                .physics
                .root_of(latch.body)
                .is_some_and(|root| ctx.ragdolled_roots.contains(&root));
            let strength = if limp_owner {
                ctx.config.ragdoll_toss_impulse
            } else {
                ctx.config.toss_impulse
            };
            let impulse = (ctx.forward + Vec3::Y * ctx.config.toss_up_bias) * strength;
            ctx.physics.apply_impulse(latch.body, impulse);
            ctx.events.push(CharacterEvent::Tossed {
                participant: ctx.participant,
                body: latch.body,
                impulse,
            });
        }

        ctx.registry.release(ctx.physics, latch.body);
        self.next_grab_at = ctx.now + ctx.config.regrab_cooldown as f64;
        self.indicator = None;

        log::debug!(
            "{} {:?} hand released {} ({:?})",
            ctx.participant,
            self.side,
            latch.body,
            reason
        );
        ctx.events.push(CharacterEvent::GrabReleased {
            participant: ctx.participant,
            hand: self.side,
            body: latch.body,
            reason,
        });
    }

    /// Funnel a snapped constraint into the release path. Returns whether it was ours.
    pub fn handle_broken(&mut self, ctx: &mut HandContext<'_>, constraint: ConstraintId) -> bool {
        let Some(latch) = self.latch.filter(|l| l.constraint == constraint) else {
            return false;
        };
        let reason = if ctx.physics.body_exists(latch.body) {
            ReleaseReason::Broken
        } else {
            ReleaseReason::BodyRemoved
        };
        self.release(ctx, reason, false);
        true
    }
}
