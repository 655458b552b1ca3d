use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::error::StageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Precondition,
    Collaborator,
}

/// Uniform failure payload persisted in a stage's slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub error: String,
}

impl From<&StageError> for StageFailure {
    fn from(error: &StageError) -> Self {
        Self {
            kind: error.kind(),
            error: error.to_string(),
        }
    }
}

/// What a stage left in its slot: its payload, or the failure that stopped it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageRecord<T> {
    Completed(T),
    Failed(StageFailure),
}

impl<T> StageRecord<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            StageRecord::Completed(value) => Some(value),
            StageRecord::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageRecord::Completed(_) => None,
            StageRecord::Failed(failure) => Some(failure),
        }
    }

    #[cfg(test)]
    pub fn is_completed(&self) -> bool {
        matches!(self, StageRecord::Completed(_))
    }
}

/// Type-erased result of executing one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Completed,
    Failed(StageFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
        }
    }
}

/// Aggregated outcome of a completed workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub execution_time_secs: f64,
    pub output_files: Vec<PathBuf>,
    pub papers_analyzed: usize,
    /// `None` when validation was skipped or failed.
    pub quality_score: Option<f64>,
}

impl RunSummary {
    pub fn quality_label(&self) -> String {
        match self.quality_score {
            Some(score) => format!("{score}"),
            None => "N/A".to_string(),
        }
    }
}
