use thiserror::Error;

use super::outcome::FailureKind;

/// Failure raised inside a stage body. Contained at the stage boundary.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    MissingInput(String),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },
}

impl StageError {
    pub fn missing(message: impl Into<String>) -> Self {
        StageError::MissingInput(message.into())
    }

    pub fn collaborator(collaborator: impl Into<String>, error: &anyhow::Error) -> Self {
        StageError::Collaborator {
            collaborator: collaborator.into(),
            message: format!("{error:#}"),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            StageError::MissingInput(_) => FailureKind::Precondition,
            StageError::Collaborator { .. } => FailureKind::Collaborator,
        }
    }
}
