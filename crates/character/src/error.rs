//! Errors surfaced by the character crate.
//!
//! Gameplay guards never fail loudly; these cover setup and configuration only.

use engine_core::{BodyId, ParticipantId};
use physics::RigError;
use std::path::PathBuf;
use thiserror::Error;

/// A character could not be created or removed.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("rig part `{name}` refers to missing body {body}")]
    MissingBody { name: String, body: BodyId },
    #[error("rig is missing its `{0}` orientation drive")]
    MissingDrive(&'static str),
    #[error("participant {0} already has a character")]
    AlreadyJoined(ParticipantId),
    #[error("participant {0} has no character")]
    UnknownParticipant(ParticipantId),
}

impl From<RigError> for SetupError {
    fn from(err: RigError) -> Self {
        match err {
            RigError::MissingBody { name, body } => SetupError::MissingBody { name, body },
            RigError::MissingDrive(which) => SetupError::MissingDrive(which),
        }
    }
}

/// Loading or saving [`crate::ControllerConfig`] failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access config at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
    #[error("could not serialize config: {0}")]
    Serialize(#[source] ron::Error),
}
