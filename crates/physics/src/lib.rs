//! Physics seam for the ragdoll character controller.
//!
//! Gameplay code talks to [`PhysicsBackend`] only. Two implementations ship:
//! [`PhysicsWorld`] on top of Rapier3D, and [`HeadlessWorld`], a small
//! deterministic integrator used by tests and tools.

pub mod backend;
pub mod collision;
pub mod headless;
pub mod physics_world;
pub mod query;
pub mod ragdoll;

pub use backend::*;
pub use collision::*;
pub use headless::*;
pub use physics_world::*;
pub use ragdoll::*;

// Re-export Rapier for downstream crates
pub use rapier3d;
