//! Thread-safe feedback queue.
//!
//! The `FeedbackManager` collects human or system feedback addressed to a
//! named agent (or broadcast with `"ALL"`) and lets in-flight pipeline steps
//! pull the unprocessed messages that apply to them. One manager exists per
//! project; every operation holds the manager's single lock for its whole
//! duration.

use chrono::Utc;
use sl_protocol::event_models::BROADCAST;
use sl_protocol::feedback_models::{FeedbackMessage, FeedbackPriority, FeedbackStats, FeedbackType};
use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Arguments for [`FeedbackManager::add_feedback`].
///
/// Defaults: type `guidance`, priority `normal`, source `"user"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub target_agent: String,
    pub feedback_type: FeedbackType,
    pub content: String,
    pub priority: FeedbackPriority,
    pub source: String,
}

impl FeedbackRequest {
    pub fn new(target_agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_agent: target_agent.into(),
            feedback_type: FeedbackType::Guidance,
            content: content.into(),
            priority: FeedbackPriority::Normal,
            source: "user".to_string(),
        }
    }

    /// Feedback addressed to every agent.
    pub fn broadcast(content: impl Into<String>) -> Self {
        Self::new(BROADCAST, content)
    }

    pub fn feedback_type(mut self, feedback_type: FeedbackType) -> Self {
        self.feedback_type = feedback_type;
        self
    }

    pub fn priority(mut self, priority: FeedbackPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Per-project collection of feedback messages.
pub struct FeedbackManager {
    project_name: String,
    messages: Mutex<Vec<FeedbackMessage>>,
}

impl FeedbackManager {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Queue a new, unprocessed message and return its id.
    pub fn add_feedback(&self, request: FeedbackRequest) -> Uuid {
        let message = FeedbackMessage {
            id: Uuid::new_v4(),
            target_agent: request.target_agent,
            feedback_type: request.feedback_type,
            content: request.content,
            priority: request.priority,
            source: request.source,
            created_at: Utc::now(),
            processed: false,
            processed_at: None,
        };
        let id = message.id;

        debug!(
            project = %self.project_name,
            target = %message.target_agent,
            priority = %message.priority,
            "Feedback queued"
        );

        self.messages().push(message);
        id
    }

    /// Messages for `agent_name`, highest priority first and, within a
    /// priority, newest first.
    ///
    /// Broadcast messages are included when `include_broadcast` is set;
    /// processed ones are skipped when `unprocessed_only` is set.
    pub fn get_feedback_for_agent(
        &self,
        agent_name: &str,
        include_broadcast: bool,
        unprocessed_only: bool,
    ) -> Vec<FeedbackMessage> {
        let messages = self.messages();
        // Walk newest-first so the stable sort keeps later insertions ahead
        // of earlier ones when timestamps tie.
        let mut matching: Vec<FeedbackMessage> = messages
            .iter()
            .rev()
            .filter(|msg| {
                let for_agent = msg.target_agent == agent_name
                    || (include_broadcast && msg.target_agent == BROADCAST);
                for_agent && !(unprocessed_only && msg.processed)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|msg| (Reverse(msg.priority), Reverse(msg.created_at)));
        matching
    }

    /// The first `n` unprocessed messages for `agent_name`, broadcast included.
    pub fn top_for_agent(&self, agent_name: &str, n: usize) -> Vec<FeedbackMessage> {
        let mut messages = self.get_feedback_for_agent(agent_name, true, true);
        messages.truncate(n);
        messages
    }

    /// Mark a message processed. Returns false for unknown or already
    /// processed ids.
    pub fn mark_as_processed(&self, id: Uuid) -> bool {
        let mut messages = self.messages();
        match messages.iter_mut().find(|msg| msg.id == id) {
            Some(msg) if !msg.processed => {
                let now = Utc::now().max(msg.created_at);
                msg.processed = true;
                msg.processed_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Remove every processed message, returning how many were removed.
    pub fn clear_processed(&self) -> usize {
        let mut messages = self.messages();
        let before = messages.len();
        messages.retain(|msg| !msg.processed);
        before - messages.len()
    }

    pub fn get_stats(&self) -> FeedbackStats {
        let messages = self.messages();
        let total = messages.len();
        let processed = messages.iter().filter(|msg| msg.processed).count();

        let by_priority = FeedbackPriority::ALL
            .into_iter()
            .map(|priority| {
                let count = messages.iter().filter(|m| m.priority == priority).count();
                (priority.name().to_string(), count)
            })
            .collect();

        let by_type = FeedbackType::ALL
            .into_iter()
            .map(|feedback_type| {
                let count = messages
                    .iter()
                    .filter(|m| m.feedback_type == feedback_type)
                    .count();
                (feedback_type.as_str().to_string(), count)
            })
            .collect();

        FeedbackStats {
            total,
            processed,
            unprocessed: total - processed,
            by_priority,
            by_type,
        }
    }

    /// Drop every message.
    pub fn reset(&self) {
        self.messages().clear();
    }

    fn messages(&self) -> MutexGuard<'_, Vec<FeedbackMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
