//! Base Agent trait and supporting types.
//!
//! Agents are external collaborators: a creative role backed by some model
//! client. The core only needs to hand an agent an instruction and read the
//! stream of events it produces.

use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};

/// Stream of events produced by one agent execution.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, AgentError>> + Send>>;

/// Context information passed to agents during execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// The instruction (prompt) for this step.
    pub instruction: String,

    /// Project the step belongs to.
    pub project_name: String,

    /// Output of the previous step, empty for the first one.
    pub previous_output: String,

    /// Feedback content folded into this step, highest priority first.
    pub feedback: Vec<String>,
}

impl ExecutionContext {
    /// Create a new ExecutionContext with the given instruction.
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn with_previous_output(mut self, output: impl Into<String>) -> Self {
        self.previous_output = output.into();
        self
    }

    pub fn with_feedback(mut self, feedback: Vec<String>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Instruction with feedback and the previous output appended, as it
    /// would be sent to a model.
    pub fn render_prompt(&self) -> String {
        let mut prompt = self.instruction.clone();
        if !self.feedback.is_empty() {
            prompt.push_str("\n\nFeedback to address:");
            for item in &self.feedback {
                prompt.push_str("\n- ");
                prompt.push_str(item);
            }
        }
        if !self.previous_output.is_empty() {
            prompt.push_str("\n\nPrevious step output:\n");
            prompt.push_str(&self.previous_output);
        }
        prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Thought(String),
    MessageChunk(String),
    Completed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("Model call failed: {0}")]
    ModelError(String),
    #[error("Stream parsing error: {0}")]
    StreamParseError(String),
    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn check_availability(&self) -> bool;
    async fn execute(&self, context: &ExecutionContext) -> Result<AgentStream, AgentError>;
}

/// Drain a stream, concatenating its message chunks.
///
/// # Errors
///
/// Returns the first error the stream yields.
pub async fn collect_output(mut stream: AgentStream) -> Result<String, AgentError> {
    let mut output = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            AgentEvent::MessageChunk(chunk) => output.push_str(&chunk),
            AgentEvent::Thought(_) => {}
            AgentEvent::Completed => break,
        }
    }
    Ok(output)
}
