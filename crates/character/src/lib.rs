//! Network-replicated active-ragdoll character controller.
//!
//! This crate provides the gameplay core on top of [`physics::PhysicsBackend`]:
//! - Per-character state machine (active, limp, dead), movement, jump and look
//! - Two grab hands with a shared mass registry
//! - Stamina economy for sprinting and hanging
//! - Health, impact damage and burnable props
//! - Replicated state and observer-side interpolation
//! - A [`Session`] that owns every character of a match on this peer

pub mod config;
pub mod controller;
pub mod damage;
pub mod error;
pub mod events;
pub mod fire;
pub mod hand;
pub mod mass_registry;
pub mod movement;
pub mod ragdoll;
pub mod replication;
pub mod session;
pub mod stamina;

#[cfg(test)]
mod testing;

pub use config::*;
pub use controller::{Character, TickContext};
pub use damage::{impact_damage, impact_knockback};
pub use error::{ConfigError, SetupError};
pub use events::*;
pub use fire::{BurnState, Burnable, FireManager};
pub use hand::{GrabGate, GrabHand, Latch};
pub use mass_registry::{MassEntry, MassRegistry};
pub use replication::{RemoteView, ReplicatedState};
pub use session::{Role, Session};
pub use stamina::Stamina;
