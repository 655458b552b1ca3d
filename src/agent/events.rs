use std::sync::{Mutex, PoisonError};

use super::types::{PhaseMode, StageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Structured audit events emitted while progressing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    PhaseStarted { phase: String, mode: PhaseMode },
    PhaseSkipped { phase: String, reason: String },
    StageStarted { stage: StageKind, task: String },
    StageCompleted { stage: StageKind, summary: String },
    StageFailed { stage: StageKind, error: String },
    Message { level: LogLevel, text: String },
}

/// Run-scoped event log. Every event is also forwarded to `tracing`.
#[derive(Debug, Default)]
pub struct RunLog {
    events: Mutex<Vec<StageEvent>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase_started(&self, phase: &str, mode: PhaseMode) {
        tracing::info!(phase, %mode, "phase start");
        self.record(StageEvent::PhaseStarted {
            phase: phase.to_string(),
            mode,
        });
    }

    pub fn phase_skipped(&self, phase: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(phase, reason = %reason, "phase skipped");
        self.record(StageEvent::PhaseSkipped {
            phase: phase.to_string(),
            reason,
        });
    }

    pub fn stage_started(&self, stage: StageKind, task: impl Into<String>) {
        let task = task.into();
        tracing::info!(stage = stage.slot_name(), role = stage.role(), task = %task, "stage start");
        self.record(StageEvent::StageStarted { stage, task });
    }

    pub fn stage_completed(&self, stage: StageKind, summary: impl Into<String>) {
        let summary = summary.into();
        tracing::info!(stage = stage.slot_name(), status = "success", output = %summary, "stage complete");
        self.record(StageEvent::StageCompleted { stage, summary });
    }

    pub fn stage_failed(&self, stage: StageKind, error: impl Into<String>) {
        let error = error.into();
        tracing::error!(stage = stage.slot_name(), error = %error, "stage failed");
        self.record(StageEvent::StageFailed { stage, error });
    }

    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("{text}");
        self.message(LogLevel::Info, text);
    }

    pub fn warning(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!("{text}");
        self.message(LogLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!("{text}");
        self.message(LogLevel::Error, text);
    }

    /// Stages that reported a failure, in the order they failed.
    #[cfg(test)]
    pub fn failed_stages(&self) -> Vec<StageKind> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StageEvent::StageFailed { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    fn message(&self, level: LogLevel, text: String) {
        self.record(StageEvent::Message { level, text });
    }

    fn record(&self, event: StageEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
