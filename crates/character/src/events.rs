//! Presentation events emitted by the controller.
//!
//! Sounds, fades and particle effects are not played from gameplay code. The
//! controller records what happened and presentation collaborators react.

use engine_core::{BodyId, ParticipantId, Vec3};
use serde::{Deserialize, Serialize};

/// Which of the two hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSide {
    Left,
    Right,
}

/// Why a latch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseReason {
    /// Grab intent went away.
    Let,
    /// The constraint snapped under load.
    Broken,
    /// The held body left the world.
    BodyRemoved,
    /// Both hands let go to kick off a wall jump.
    WallJump,
    /// Stamina ran out while hanging.
    Exhausted,
    /// The character went limp.
    Ragdoll,
    /// The character left the session.
    Despawn,
}

/// Direction of the death fade shown to the owning participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadeDirection {
    /// Fade to black on death.
    In,
    /// Fade back on revive.
    Out,
}

/// Something presentation code may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharacterEvent {
    Jumped {
        participant: ParticipantId,
        wall_jump: bool,
    },
    Damaged {
        participant: ParticipantId,
        amount: i32,
        remaining: i32,
    },
    Died {
        participant: ParticipantId,
    },
    BecameRagdoll {
        participant: ParticipantId,
    },
    StoodUp {
        participant: ParticipantId,
        revived: bool,
    },
    /// Only the owning participant should act on this.
    Fade {
        to: ParticipantId,
        direction: FadeDirection,
    },
    GrabbingSignal {
        participant: ParticipantId,
        hand: HandSide,
        grabbing: bool,
    },
    GrabStarted {
        participant: ParticipantId,
        hand: HandSide,
        body: BodyId,
        immovable: bool,
    },
    GrabIndicatorMoved {
        participant: ParticipantId,
        hand: HandSide,
        position: Vec3,
    },
    GrabReleased {
        participant: ParticipantId,
        hand: HandSide,
        body: BodyId,
        reason: ReleaseReason,
    },
    Tossed {
        participant: ParticipantId,
        body: BodyId,
        impulse: Vec3,
    },
    Respawned {
        participant: ParticipantId,
        position: Vec3,
    },
}

impl CharacterEvent {
    /// The participant whose character produced the event.
    pub fn participant(&self) -> ParticipantId {
        match self {
            CharacterEvent::Jumped { participant, .. }
            | CharacterEvent::Damaged { participant, .. }
            | CharacterEvent::Died { participant }
            | CharacterEvent::BecameRagdoll { participant }
            | CharacterEvent::StoodUp { participant, .. }
            | CharacterEvent::GrabbingSignal { participant, .. }
            | CharacterEvent::GrabStarted { participant, .. }
            | CharacterEvent::GrabIndicatorMoved { participant, .. }
            | CharacterEvent::GrabReleased { participant, .. }
            | CharacterEvent::Tossed { participant, .. }
            | CharacterEvent::Respawned { participant, .. } => *participant,
            CharacterEvent::Fade { to, .. } => *to,
        }
    }
}
