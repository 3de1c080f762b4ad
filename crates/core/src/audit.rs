//! Append-only activity history.
//!
//! The event bus forgets; the audit sink is where producers record what
//! should outlive the ring buffer. Only an in-memory implementation ships
//! here. A persistent one implements [`AuditSink`] elsewhere.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sl_protocol::event_models::{Event, BROADCAST};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded activity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub project_name: String,
    /// e.g. "agent_output", "user_feedback", "pipeline_status".
    pub event_type: String,
    pub sender: String,
    pub recipient: String,
    pub payload: Map<String, Value>,
}

impl AuditEntry {
    pub fn new(
        project_name: &str,
        event_type: &str,
        sender: &str,
        recipient: &str,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            project_name: project_name.to_string(),
            event_type: event_type.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            payload,
        }
    }

    pub fn from_event(event: &Event) -> Self {
        Self::new(
            &event.project_name,
            &event.event_type,
            &event.sender,
            &event.recipient,
            event.payload.clone(),
        )
    }
}

/// Query over recorded entries. Unset fields match anything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub event_type: Option<String>,
    pub sender: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.event_type
            .as_deref()
            .map_or(true, |t| entry.event_type == t)
            && self.sender.as_deref().map_or(true, |s| entry.sender == s)
    }
}

pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry);

    /// Up to `limit` newest entries, newest first.
    fn recent(&self, limit: usize) -> Vec<AuditEntry>;

    /// Matching entries, oldest first.
    fn search(&self, query: &AuditQuery) -> Vec<AuditEntry>;
}

/// Unbounded in-memory sink.
#[derive(Default)]
pub struct MemoryAuditLog {
    project_name: String,
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, entry: AuditEntry) {
        self.entries().push(entry);
    }

    fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries().iter().rev().take(limit).cloned().collect()
    }

    fn search(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        self.entries()
            .iter()
            .filter(|entry| query.matches(entry))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Record every broadcast event published on `bus` into `sink`, once each.
pub fn record_broadcasts(bus: &crate::event_bus::EventBus, sink: Arc<dyn AuditSink>) {
    bus.observe(move |event| {
        if event.recipient == BROADCAST {
            sink.append(AuditEntry::from_event(event));
        }
        Ok(())
    });
}
