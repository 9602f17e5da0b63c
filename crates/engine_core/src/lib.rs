//! Core types shared by every crate of the ragdoll character stack.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform and spatial helpers
//! - Fixed-tick simulation time
//! - Opaque identities for bodies, joints, constraints and participants
//! - Integer health

pub mod components;
pub mod ids;
pub mod time;
pub mod transform;

pub use components::*;
pub use ids::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{EulerRot, Quat, Vec2, Vec3};
