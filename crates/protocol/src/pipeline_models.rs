//! Pipeline definition models for `.storyloom/pipelines/*.yaml`.
//!
//! A pipeline is an ordered list of agent steps. Between steps the running
//! pipeline checks for pause/stop requests and folds queued feedback into
//! the next agent's instruction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Defines a story pipeline.
///
/// # Example
///
/// ```yaml
/// name: chapter
/// description: Plan, draft, check and polish one chapter
/// feedback-per-step: 3
/// steps:
///   - plot_architect
///   - scene_generator
///   - continuity_checker
///   - editor
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDefinition {
    /// Unique name identifying this pipeline.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Agent names, run in order.
    pub steps: Vec<String>,

    /// How many feedback messages each step consumes.
    ///
    /// Falls back to the project setting when absent.
    #[serde(default)]
    pub feedback_per_step: Option<usize>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps,
            feedback_per_step: None,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }
}
