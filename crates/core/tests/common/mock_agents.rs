//! Agents for deterministic step control.

use async_trait::async_trait;
use sl_core::agents::{Agent, AgentError, AgentEvent, AgentStream, ExecutionContext};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Answers only after [`Gate::open`] has been called once per execution,
/// and remembers every context it was given.
#[allow(dead_code)]
pub struct GatedAgent {
    name: String,
    gate: Arc<Notify>,
    seen: Arc<Mutex<Vec<ExecutionContext>>>,
}

/// Test-side handle of a [`GatedAgent`].
#[allow(dead_code)]
#[derive(Clone)]
pub struct Gate {
    gate: Arc<Notify>,
    seen: Arc<Mutex<Vec<ExecutionContext>>>,
}

#[allow(dead_code)]
impl GatedAgent {
    pub fn new(name: &str) -> (Self, Gate) {
        let gate = Arc::new(Notify::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let agent = Self {
            name: name.to_string(),
            gate: gate.clone(),
            seen: seen.clone(),
        };
        (agent, Gate { gate, seen })
    }
}

#[allow(dead_code)]
impl Gate {
    /// Let one pending (or the next) execution finish.
    pub fn open(&self) {
        self.gate.notify_one();
    }

    /// Number of executions started so far.
    pub fn started(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<ExecutionContext> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for GatedAgent {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<AgentStream, AgentError> {
        self.seen.lock().unwrap().push(context.clone());

        let gate = self.gate.clone();
        let reply = format!("[{}] done", self.name);
        let stream = async_stream::stream! {
            gate.notified().await;
            yield Ok(AgentEvent::MessageChunk(reply));
            yield Ok(AgentEvent::Completed);
        };
        Ok(Box::pin(stream))
    }
}

/// An agent that always fails with a predefined error.
#[allow(dead_code)]
pub struct MockFailureAgent {
    pub error_message: String,
}

#[allow(dead_code)]
impl MockFailureAgent {
    pub fn new(error_message: &str) -> Self {
        Self {
            error_message: error_message.to_string(),
        }
    }
}

#[async_trait]
impl Agent for MockFailureAgent {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn execute(&self, _context: &ExecutionContext) -> Result<AgentStream, AgentError> {
        let message = self.error_message.clone();
        let stream = async_stream::stream! {
            yield Ok(AgentEvent::Thought("Starting...".to_string()));
            yield Err(AgentError::ModelError(message));
        };
        Ok(Box::pin(stream))
    }
}
