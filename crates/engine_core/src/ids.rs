//! Opaque identities handed out by the physics backend and the session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rigid body known to the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// A driven joint (orientation spring) known to the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointId(pub u64);

/// A breakable point constraint created for a grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

/// A connected participant of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P_{}", self.0)
    }
}

/// Split a generational arena index into a stable 64-bit id.
pub fn pack_arena_index(index: u32, generation: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(index)
}

/// Inverse of [`pack_arena_index`].
pub fn unpack_arena_index(raw: u64) -> (u32, u32) {
    (raw as u32, (raw >> 32) as u32)
}
