//! Project settings models for `.storyloom/config.toml`.
//!
//! Every section and field is optional in the file; missing values fall back
//! to the defaults documented on each field.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents project settings from `.storyloom/config.toml`.
///
/// # Example
///
/// ```toml
/// [event_bus]
/// capacity = 100
///
/// [feedback]
/// per_step = 3
///
/// [pipeline]
/// timeout_secs = 600
///
/// [realtime]
/// channel_capacity = 64
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct Settings {
    #[serde(default)]
    pub event_bus: EventBusSettings,

    #[serde(default)]
    pub feedback: FeedbackSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub realtime: RealtimeSettings,
}

/// Event bus tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct EventBusSettings {
    /// Ring buffer size per project. Defaults to 100.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

/// Feedback consumption settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct FeedbackSettings {
    /// How many feedback messages an agent step consumes. Defaults to 3.
    #[serde(default = "default_feedback_per_step")]
    pub per_step: usize,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            per_step: default_feedback_per_step(),
        }
    }
}

/// Pipeline run settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct PipelineSettings {
    /// Advisory run timeout in seconds. Defaults to 600.
    ///
    /// Surfaced to clients for display; the controller does not enforce it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Outbound notification settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct RealtimeSettings {
    /// Per-project notification channel capacity. Defaults to 64.
    ///
    /// Slow subscribers that fall further behind than this lose the oldest
    /// notifications.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    100
}

fn default_feedback_per_step() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_channel_capacity() -> usize {
    64
}
