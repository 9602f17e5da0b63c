//! Physics backend abstraction.
//!
//! This module defines the trait that physics engines must implement to drive
//! the character controller. The controller only ever needs rigid bodies,
//! breakable point constraints, orientation drives, contact queries and a
//! downward shape-cast, so that is all the trait exposes.

use engine_core::{BodyId, ConstraintId, JointId, Quat, Transform, Vec3};

/// How a rigid body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by forces and contacts.
    Dynamic,
    /// Moved by user code only; infinite mass from the solver's view.
    Kinematic,
    /// Never moves.
    Fixed,
}

impl BodyKind {
    /// Kinematic and fixed bodies cannot be pushed around by a character.
    pub fn is_immovable(self) -> bool {
        !matches!(self, BodyKind::Dynamic)
    }
}

/// A swept-sphere query.
#[derive(Debug, Clone, Copy)]
pub struct ShapeCast {
    /// Sphere centre at the start of the sweep.
    pub origin: Vec3,
    /// Sweep direction (normalized by the backend).
    pub direction: Vec3,
    /// Sphere radius.
    pub radius: f32,
    /// Sweep length.
    pub max_distance: f32,
    /// Maximum number of hits to report, nearest first.
    pub max_hits: usize,
}

/// One result of a [`ShapeCast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHit {
    /// Body owning the hit collider, `None` for free-standing static geometry.
    pub body: Option<BodyId>,
    /// Root of the hit body's hierarchy.
    pub root: Option<BodyId>,
    /// World-space point on the hit collider.
    pub point: Vec3,
    /// Distance along the sweep.
    pub distance: f32,
}

/// A contact currently touching a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The other body, `None` for free-standing static geometry.
    pub other: Option<BodyId>,
    /// Root of the other body's hierarchy.
    pub other_root: Option<BodyId>,
    /// World-space contact point.
    pub point: Vec3,
    /// Impulse the contact applied to the queried body during the last step.
    pub impulse: Vec3,
}

/// Parameters of a breakable point constraint between a hand and a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointConstraint {
    pub hand: BodyId,
    pub target: BodyId,
    /// Anchor in the hand's local space.
    pub hand_anchor: Vec3,
    /// Anchor in the target's local space.
    pub target_anchor: Vec3,
    pub break_force: f32,
    pub break_torque: f32,
}

/// Trait for physics backend implementations.
///
/// All methods are synchronous. Unknown ids are tolerated: getters return
/// `None`/zero and mutators do nothing, since bodies can disappear between
/// ticks (dissolved props, despawned characters).
pub trait PhysicsBackend {
    /// Whether the body still exists in the world.
    fn body_exists(&self, body: BodyId) -> bool;

    fn body_kind(&self, body: BodyId) -> Option<BodyKind>;

    /// Root of the body's hierarchy. A body without a registered root is its own root.
    fn root_of(&self, body: BodyId) -> Option<BodyId>;

    fn mass(&self, body: BodyId) -> Option<f32>;

    /// Override the live mass of a dynamic body.
    fn set_mass(&mut self, body: BodyId, mass: f32);

    fn pose(&self, body: BodyId) -> Option<Transform>;

    /// Teleport a body.
    fn set_pose(&mut self, body: BodyId, pose: Transform);

    fn linear_velocity(&self, body: BodyId) -> Vec3;

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec3);

    /// Instantaneous change in momentum.
    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3);

    /// Force applied over the next physics step only.
    fn apply_force(&mut self, body: BodyId, force: Vec3);

    /// Sweep a sphere and return up to `cast.max_hits` hits, nearest first.
    fn shape_cast(&self, cast: &ShapeCast) -> Vec<ShapeHit>;

    /// Contacts currently touching `body`.
    fn contacts(&self, body: BodyId) -> Vec<Contact>;

    /// Create a breakable point constraint. Returns `None` if either body is gone.
    fn create_point_constraint(&mut self, constraint: &PointConstraint) -> Option<ConstraintId>;

    /// Destroy a constraint. Destroying an unknown or broken constraint is a no-op.
    fn destroy_constraint(&mut self, id: ConstraintId);

    /// Constraints that broke (excess force/torque, or a body vanished) since the last call.
    fn drain_broken_constraints(&mut self) -> Vec<ConstraintId>;

    /// Target rotation of an orientation drive.
    fn drive_target(&self, joint: JointId) -> Option<Quat>;

    fn set_drive_target(&mut self, joint: JointId, target: Quat);

    /// Spring strength of an orientation drive. Zero means fully limp.
    fn drive_spring(&self, joint: JointId) -> Option<f32>;

    fn set_drive_spring(&mut self, joint: JointId, spring: f32);

    /// Remove a body and every constraint attached to it.
    fn remove_body(&mut self, body: BodyId);

    /// The fixed timestep the backend integrates with, in seconds.
    fn fixed_timestep(&self) -> f32;

    /// Whether an orientation drive exists.
    fn has_drive(&self, joint: JointId) -> bool {
        self.drive_spring(joint).is_some()
    }

    /// Whether the body is kinematic or fixed.
    fn is_immovable(&self, body: BodyId) -> bool {
        self.body_kind(body).is_some_and(BodyKind::is_immovable)
    }
}
