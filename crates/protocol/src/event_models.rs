//! Event bus records.
//!
//! Events are short-lived coordination messages scoped to one project. They
//! live only in the in-memory ring buffer of the project's event bus.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use ts_rs::TS;
use uuid::Uuid;

/// Recipient name that addresses every agent.
pub const BROADCAST: &str = "ALL";

/// A single pub/sub message.
///
/// Immutable once created. Serialized with a `type` key for the event type
/// so that clients see the same shape as the bus uses internally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Event {
    #[ts(type = "string")]
    pub id: Uuid,

    pub project_name: String,

    /// Who published the event (agent name, "user", "pipeline_controller").
    pub sender: String,

    /// Agent name, or [`BROADCAST`] for every agent.
    pub recipient: String,

    #[serde(rename = "type")]
    pub event_type: String,

    #[ts(type = "Record<string, unknown>")]
    pub payload: Map<String, Value>,

    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl Event {
    /// Build a new event with a fresh id and the current time.
    pub fn new(
        project_name: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        event_type: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_name: project_name.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            event_type: event_type.into(),
            payload,
            timestamp: unix_timestamp(),
        }
    }

    /// Whether this event is visible to `agent_name`, directly or by broadcast.
    pub fn is_for(&self, agent_name: &str) -> bool {
        self.recipient == agent_name || self.recipient == BROADCAST
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient == BROADCAST
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
