//! Human-in-the-loop feedback models.
//!
//! Feedback messages are queued for an agent (or broadcast to all agents)
//! and picked up by in-flight pipeline steps between agent invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// Kind of guidance a feedback message carries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Guidance,
    Critique,
    Correction,
    Suggestion,
    /// A story canon rule the agent must respect.
    Canon,
    Priority,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 6] = [
        FeedbackType::Guidance,
        FeedbackType::Critique,
        FeedbackType::Correction,
        FeedbackType::Suggestion,
        FeedbackType::Canon,
        FeedbackType::Priority,
    ];

    /// Wire value, as used in stats keys.
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackType::Guidance => "guidance",
            FeedbackType::Critique => "critique",
            FeedbackType::Correction => "correction",
            FeedbackType::Suggestion => "suggestion",
            FeedbackType::Canon => "canon",
            FeedbackType::Priority => "priority",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = ParseFeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFeedbackError::UnknownType(s.to_string()))
    }
}

/// Priority of a feedback message. Higher values are consumed first.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackPriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
    Urgent = 5,
}

impl FeedbackPriority {
    pub const ALL: [FeedbackPriority; 5] = [
        FeedbackPriority::Low,
        FeedbackPriority::Normal,
        FeedbackPriority::High,
        FeedbackPriority::Critical,
        FeedbackPriority::Urgent,
    ];

    /// Numeric level, 1 (low) through 5 (urgent).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Upper-case name, as used in stats keys.
    pub fn name(self) -> &'static str {
        match self {
            FeedbackPriority::Low => "LOW",
            FeedbackPriority::Normal => "NORMAL",
            FeedbackPriority::High => "HIGH",
            FeedbackPriority::Critical => "CRITICAL",
            FeedbackPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for FeedbackPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeedbackPriority {
    type Err = ParseFeedbackError;

    /// Accepts either the name (`"high"`, `"URGENT"`) or the level (`"3"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(level) = s.parse::<u8>() {
            return FeedbackPriority::ALL
                .into_iter()
                .find(|p| p.value() == level)
                .ok_or_else(|| ParseFeedbackError::UnknownPriority(s.to_string()));
        }
        FeedbackPriority::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseFeedbackError::UnknownPriority(s.to_string()))
    }
}

/// Errors from parsing feedback enums out of user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFeedbackError {
    #[error("unknown feedback type: {0}")]
    UnknownType(String),
    #[error("unknown feedback priority: {0}")]
    UnknownPriority(String),
}

/// A single feedback message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct FeedbackMessage {
    #[ts(type = "string")]
    pub id: Uuid,

    /// Agent name, or `"ALL"` for broadcast.
    pub target_agent: String,

    pub feedback_type: FeedbackType,

    pub content: String,

    pub priority: FeedbackPriority,

    /// Origin of the message: "user", "agent" or "system".
    pub source: String,

    pub created_at: DateTime<Utc>,

    pub processed: bool,

    /// Set together with `processed`; never earlier than `created_at`.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Counts over every message a feedback manager holds.
///
/// `by_priority` is keyed by priority name and `by_type` by type value; both
/// always contain every key, with zero counts where nothing matches.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct FeedbackStats {
    pub total: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}
