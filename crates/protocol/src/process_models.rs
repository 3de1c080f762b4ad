//! Runtime pipeline state models.
//!
//! This module defines the structures for reporting the state of a running
//! pipeline to any observer: status, progress, typed failures and the
//! combined snapshot returned by the controller.

use crate::feedback_models::FeedbackStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Represents the lifecycle status of a project's pipeline.
///
/// Normal flow: Idle -> Running -> Completed
///
/// Special states:
/// - Paused: suspended by the user at the next checkpoint
/// - Stopped: cancelled by the user
/// - Error: the pipeline returned an error or panicked
///
/// Completed, Stopped and Error accept a new run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    Error,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::Running => "running",
            PipelineStatus::Paused => "paused",
            PipelineStatus::Stopped => "stopped",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Error => "error",
        }
    }

    /// A run is in flight and must not be replaced.
    pub fn is_active(self) -> bool {
        matches!(self, PipelineStatus::Running | PipelineStatus::Paused)
    }

    /// The run has ended, one way or another.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStatus::Stopped | PipelineStatus::Completed | PipelineStatus::Error
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the current run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct PipelineProgress {
    /// 1-based number of the step being worked on.
    pub step_number: usize,
    pub total_steps: usize,
    pub current_step: String,
    pub step_description: String,
    /// `100 * step_number / total_steps`, or 0 when there are no steps.
    pub percent_complete: f64,
}

impl PipelineProgress {
    /// Fresh progress for a run of `total_steps` steps.
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            ..Self::default()
        }
    }

    /// Record a step and recompute the percentage.
    pub fn record(&mut self, step_number: usize, current_step: &str, step_description: &str) {
        self.step_number = step_number;
        self.current_step = current_step.to_string();
        self.step_description = step_description.to_string();
        self.percent_complete = if self.total_steps > 0 {
            step_number as f64 / self.total_steps as f64 * 100.0
        } else {
            0.0
        };
    }
}

/// Why a run ended in `Error` (or was cancelled).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An agent or the model behind it failed.
    Model,
    /// The run was stopped at a checkpoint.
    Cancelled,
    /// The pipeline parameters were rejected.
    InvalidParams,
    /// The background runtime could not be started.
    Runtime,
    /// Anything else, including panics inside the pipeline.
    Unknown,
}

/// Typed failure carried in the status snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct PipelineFailure {
    pub kind: FailureKind,
    /// Rendered error message.
    pub message: String,
    /// Rendered source error, when the failure wraps one.
    pub cause: Option<String>,
}

impl PipelineFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => f.write_str(&self.message),
        }
    }
}

/// Consistent snapshot of a project's pipeline controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StatusSnapshot {
    pub project_name: String,
    pub status: PipelineStatus,

    /// Task name while a run is active, `None` once it completes, and
    /// `"Error: <message>"` after a failure.
    pub current_task: Option<String>,

    pub progress: PipelineProgress,
    pub feedback_stats: FeedbackStats,
    pub failure: Option<PipelineFailure>,

    pub is_running: bool,
    pub is_paused: bool,
    /// True for Stopped, Completed and Error.
    pub is_stopped: bool,
}
