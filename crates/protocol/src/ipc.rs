//! Client communication protocol.
//!
//! This module defines the message types exchanged between a client (CLI,
//! web UI, RPC facade) and the coordination core.
//!
//! The protocol follows an Operation/Reply/Notification pattern:
//! - `Op`: Commands sent from a client to the core
//! - `Reply`: The synchronous answer to one `Op`
//! - `Notification`: Status pushes from the core to subscribed clients
//!
//! All three use tagged serialization so a socket transport can relay them
//! as JSON without further wrapping.

use crate::feedback_models::{FeedbackPriority, FeedbackType};
use crate::process_models::{PipelineProgress, StatusSnapshot};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Operations sent from a client to the core.
///
/// ```json
/// {
///   "type": "injectFeedback",
///   "payload": {
///     "project": "noir",
///     "target_agent": "scene_generator",
///     "content": "make it darker"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Start a pipeline definition for a project.
    StartPipeline {
        project: String,
        /// Name of a pipeline in `.storyloom/pipelines/`.
        pipeline: String,
        /// Story premise handed to the first agent.
        #[serde(default)]
        idea: String,
    },

    /// Suspend the project's run at its next checkpoint.
    PausePipeline { project: String },

    /// Continue a paused run.
    ResumePipeline { project: String },

    /// Cancel the project's run at its next checkpoint.
    StopPipeline { project: String },

    /// Queue feedback for an agent, or `"ALL"`.
    InjectFeedback {
        project: String,
        target_agent: String,
        content: String,
        #[serde(default = "default_feedback_type")]
        feedback_type: FeedbackType,
        #[serde(default)]
        priority: FeedbackPriority,
        #[serde(default = "default_source")]
        source: String,
    },

    /// Request the project's current status snapshot.
    GetStatus { project: String },
}

impl Op {
    /// Project the operation is addressed to.
    pub fn project(&self) -> &str {
        match self {
            Op::StartPipeline { project, .. }
            | Op::PausePipeline { project }
            | Op::ResumePipeline { project }
            | Op::StopPipeline { project }
            | Op::InjectFeedback { project, .. }
            | Op::GetStatus { project } => project,
        }
    }
}

fn default_feedback_type() -> FeedbackType {
    FeedbackType::Guidance
}

fn default_source() -> String {
    "user".to_string()
}

/// The answer to a single [`Op`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Reply {
    /// A state-machine command was applied (`accepted`) or was a no-op.
    Ack { accepted: bool },

    /// Feedback was queued under this id.
    FeedbackQueued {
        #[ts(type = "string")]
        id: Uuid,
    },

    /// Current status snapshot.
    Status { snapshot: StatusSnapshot },

    /// The operation could not be carried out.
    Rejected { reason: String },
}

/// Pushes sent from the core to clients subscribed to a project.
///
/// ```json
/// {
///   "type": "pipelineProgress",
///   "payload": {
///     "project": "noir",
///     "progress": { "step_number": 2, "total_steps": 4, "...": "..." },
///     "timestamp": 1760000000.5
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Notification {
    /// The controller's status changed.
    PipelineStatus {
        project: String,
        snapshot: StatusSnapshot,
        timestamp: f64,
    },

    /// The running pipeline reported a new step.
    PipelineProgress {
        project: String,
        progress: PipelineProgress,
        timestamp: f64,
    },

    /// First message on every new subscription.
    SubscriptionConfirmed { project: String, timestamp: f64 },
}

impl Notification {
    pub fn project(&self) -> &str {
        match self {
            Notification::PipelineStatus { project, .. }
            | Notification::PipelineProgress { project, .. }
            | Notification::SubscriptionConfirmed { project, .. } => project,
        }
    }
}
