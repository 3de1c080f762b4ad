//! Mock agent implementation for tests and offline runs.

use crate::agents::base::{Agent, AgentError, AgentEvent, AgentStream, ExecutionContext};
use async_stream::stream;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone)]
enum Script {
    /// Replay a fixed list of events.
    Events(Vec<Result<AgentEvent, AgentError>>),
    /// Answer with a one-line summary of the instruction, tagged with a label.
    Echo(String),
}

/// Agent that never talks to a model.
#[derive(Clone)]
pub struct MockAgent {
    available: bool,
    script: Script,
    delay: Duration,
}

impl MockAgent {
    pub fn new(available: bool, events: Vec<Result<AgentEvent, AgentError>>) -> Self {
        Self {
            available,
            script: Script::Events(events),
            delay: Duration::ZERO,
        }
    }

    pub fn success() -> Self {
        Self::new(
            true,
            vec![
                Ok(AgentEvent::Thought("Mock agent thinking".to_string())),
                Ok(AgentEvent::MessageChunk("Mock response".to_string())),
                Ok(AgentEvent::Completed),
            ],
        )
    }

    pub fn unavailable() -> Self {
        Self::new(false, vec![])
    }

    pub fn failing() -> Self {
        Self::new(
            true,
            vec![
                Ok(AgentEvent::Thought("Starting...".to_string())),
                Err(AgentError::ModelError("Mock failure".to_string())),
            ],
        )
    }

    /// Agent that answers `[label] <first line of the prompt>`.
    pub fn echo(label: impl Into<String>) -> Self {
        Self {
            available: true,
            script: Script::Echo(label.into()),
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` before emitting each event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn events_for(&self, context: &ExecutionContext) -> Vec<Result<AgentEvent, AgentError>> {
        match &self.script {
            Script::Events(events) => events.clone(),
            Script::Echo(label) => {
                let headline = context.instruction.lines().next().unwrap_or_default();
                let mut reply = format!("[{label}] {headline}");
                if !context.feedback.is_empty() {
                    reply.push_str(&format!(" (addressed {} notes)", context.feedback.len()));
                }
                vec![
                    Ok(AgentEvent::Thought(format!("{label} is working"))),
                    Ok(AgentEvent::MessageChunk(reply)),
                    Ok(AgentEvent::Completed),
                ]
            }
        }
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<AgentStream, AgentError> {
        if !self.available {
            return Err(AgentError::NotAvailable("Mock agent not available".to_string()));
        }

        let events = self.events_for(context);
        if self.delay.is_zero() {
            return Ok(Box::pin(tokio_stream::iter(events)));
        }

        let delay = self.delay;
        Ok(Box::pin(stream! {
            for event in events {
                tokio::time::sleep(delay).await;
                yield event;
            }
        }))
    }
}
