//! Agent definition models for `.storyloom/agents/*.md`.
//!
//! Agents are defined as Markdown files with YAML front matter. The front
//! matter carries metadata and the body is the agent's system prompt.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents a creative agent's definition and system prompt.
///
/// # Example
///
/// ```markdown
/// ---
/// name: scene_generator
/// description: Drafts scenes from the chapter outline
/// model: qwen2.5-7b-instruct
/// role: writer
/// ---
///
/// You are a novelist. Write vivid, concrete scenes that follow the outline.
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct AgentDefinition {
    /// Unique identifier for this agent.
    ///
    /// Used as the feedback target and as a step name in pipeline definitions.
    pub name: String,

    /// Human-readable description of the agent's purpose.
    pub description: String,

    /// Model the agent talks to (e.g., "qwen2.5-3b-instruct").
    pub model: String,

    /// Free-form role label shown in the UI (e.g., "planner", "writer").
    #[serde(default)]
    pub role: String,

    /// The body of the .md file, not part of the front matter.
    #[serde(skip)]
    pub system_prompt: String,
}
