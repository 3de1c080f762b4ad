//! Error types for pipeline runs and the controller.

use crate::agents::AgentError;
use sl_protocol::process_models::{FailureKind, PipelineFailure};
use std::error::Error as _;
use thiserror::Error;

/// Errors a pipeline job can return from its run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An agent or the model behind it failed.
    #[error("Agent '{agent}' failed")]
    Model {
        agent: String,
        #[source]
        source: AgentError,
    },

    /// The run observed a stop request at a checkpoint.
    #[error("Pipeline stopped by user")]
    Cancelled,

    /// The job's parameters were rejected.
    #[error("Invalid pipeline parameters: {0}")]
    InvalidParams(String),

    /// A step names an agent nobody registered.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Model { .. } | PipelineError::AgentNotFound(_) => FailureKind::Model,
            PipelineError::Cancelled => FailureKind::Cancelled,
            PipelineError::InvalidParams(_) => FailureKind::InvalidParams,
            PipelineError::Other(_) => FailureKind::Unknown,
        }
    }

    /// Typed failure record for the status snapshot.
    pub fn to_failure(&self) -> PipelineFailure {
        let failure = PipelineFailure::new(self.kind(), self.to_string());
        match self.source() {
            Some(cause) => failure.with_cause(cause.to_string()),
            None => failure,
        }
    }
}

/// Errors returned by [`PipelineController::start_pipeline`](super::PipelineController::start_pipeline).
#[derive(Error, Debug)]
pub enum ControllerError {
    /// The job rejected its parameters; the controller state is unchanged.
    #[error("Invalid pipeline parameters: {0}")]
    InvalidParams(String),

    /// The background thread could not be spawned.
    #[error("Failed to spawn pipeline thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_failure_carries_cause() {
        let err = PipelineError::Model {
            agent: "scene_generator".to_string(),
            source: AgentError::ModelError("connection refused".to_string()),
        };
        let failure = err.to_failure();

        assert_eq!(failure.kind, FailureKind::Model);
        assert_eq!(failure.message, "Agent 'scene_generator' failed");
        assert_eq!(
            failure.cause.as_deref(),
            Some("Model call failed: connection refused")
        );
    }

    #[test]
    fn test_other_failure_kind() {
        let err = PipelineError::from(anyhow::anyhow!("disk full"));
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::Unknown);
        assert_eq!(failure.message, "disk full");
    }

    #[test]
    fn test_cancelled_kind() {
        assert_eq!(PipelineError::Cancelled.kind(), FailureKind::Cancelled);
        assert!(PipelineError::Cancelled.to_failure().cause.is_none());
    }
}
