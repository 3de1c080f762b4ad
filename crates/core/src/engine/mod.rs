//! Story pipeline engine.
//!
//! `StoryPipeline` is the concrete [`PipelineJob`] behind a pipeline
//! definition: an ordered list of agent steps. For every step it
//!
//! 1. reports progress (which also waits out a pause and honors a stop),
//! 2. pulls the top unprocessed feedback for the step's agent, broadcast
//!    feedback included, and folds it into the instruction,
//! 3. runs the agent and collects its output,
//! 4. marks the consumed feedback processed,
//! 5. publishes an `agent_output` event and records it in the audit sink.
//!
//! The output of each step is handed to the next one.

use crate::agents::{collect_output, AgentManager, ExecutionContext};
use crate::audit::{AuditEntry, AuditSink};
use crate::event_bus::payload;
use crate::state::{Checkpoint, PipelineContext, PipelineError, PipelineJob};
use async_trait::async_trait;
use serde_json::{json, Value};
use sl_protocol::event_models::BROADCAST;
use sl_protocol::pipeline_models::PipelineDefinition;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Event type published after every completed step.
pub const AGENT_OUTPUT_EVENT: &str = "agent_output";

/// Default number of feedback messages a step consumes.
pub const DEFAULT_FEEDBACK_PER_STEP: usize = 3;

/// A pipeline definition bound to its agents and a story idea.
pub struct StoryPipeline {
    definition: PipelineDefinition,
    agents: Arc<AgentManager>,
    idea: String,
    feedback_per_step: usize,
    audit: Option<Arc<dyn AuditSink>>,
    step_delay: Duration,
}

impl StoryPipeline {
    /// Create a job for `definition`.
    ///
    /// # Arguments
    ///
    /// * `definition` - Steps to run, in order
    /// * `agents` - Resolves each step's agent by name
    /// * `idea` - Story premise handed to the first step
    pub fn new(
        definition: PipelineDefinition,
        agents: Arc<AgentManager>,
        idea: impl Into<String>,
    ) -> Self {
        let feedback_per_step = definition
            .feedback_per_step
            .unwrap_or(DEFAULT_FEEDBACK_PER_STEP);
        Self {
            definition,
            agents,
            idea: idea.into(),
            feedback_per_step,
            audit: None,
            step_delay: Duration::ZERO,
        }
    }

    /// Fallback for definitions that do not set `feedback-per-step`.
    pub fn with_default_feedback_per_step(mut self, n: usize) -> Self {
        if self.definition.feedback_per_step.is_none() {
            self.feedback_per_step = n;
        }
        self
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Pause for `delay` after each step.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn total_steps(&self) -> usize {
        self.definition.total_steps()
    }

    fn instruction_for(&self, agent_name: &str, step_number: usize) -> String {
        let role = self
            .agents
            .definition(agent_name)
            .map(|d| d.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(agent_name);
        format!(
            "Step {step_number} of {} in '{}': {role}.\nStory idea: {}",
            self.total_steps(),
            self.definition.name,
            self.idea
        )
    }

    async fn run_step(
        &self,
        ctx: &PipelineContext,
        step_number: usize,
        agent_name: &str,
        previous_output: &str,
    ) -> Result<String, PipelineError> {
        ctx.update_progress(step_number, agent_name, &format!("Running {agent_name}"))
            .await?;

        let feedback = ctx.feedback().top_for_agent(agent_name, self.feedback_per_step);
        let feedback_ids: Vec<Uuid> = feedback.iter().map(|m| m.id).collect();

        let context = ExecutionContext::new(self.instruction_for(agent_name, step_number))
            .with_project(ctx.project_name())
            .with_previous_output(previous_output)
            .with_feedback(feedback.into_iter().map(|m| m.content).collect());

        let model_error = |source| PipelineError::Model {
            agent: agent_name.to_string(),
            source,
        };
        let stream = self
            .agents
            .execute(agent_name, &context)
            .await
            .map_err(model_error)?;
        let output = collect_output(stream).await.map_err(model_error)?;

        for id in &feedback_ids {
            ctx.feedback().mark_as_processed(*id);
        }

        let event_payload = payload([
            ("step", json!(step_number)),
            ("agent", json!(agent_name)),
            ("output", json!(output)),
            ("feedback_applied", json!(feedback_ids)),
        ]);
        if let Some(audit) = &self.audit {
            audit.append(AuditEntry::new(
                ctx.project_name(),
                AGENT_OUTPUT_EVENT,
                agent_name,
                BROADCAST,
                event_payload.clone(),
            ));
        }
        ctx.event_bus()
            .publish(agent_name, BROADCAST, AGENT_OUTPUT_EVENT, event_payload);

        debug!(
            project = %ctx.project_name(),
            agent = agent_name,
            feedback = feedback_ids.len(),
            "Step completed"
        );
        Ok(output)
    }
}

#[async_trait]
impl PipelineJob for StoryPipeline {
    fn validate(&self) -> Result<(), PipelineError> {
        if self.definition.steps.is_empty() {
            return Err(PipelineError::InvalidParams(format!(
                "pipeline '{}' has no steps",
                self.definition.name
            )));
        }
        if self.idea.trim().is_empty() {
            return Err(PipelineError::InvalidParams(
                "story idea must not be empty".to_string(),
            ));
        }
        if let Some(missing) = self
            .definition
            .steps
            .iter()
            .find(|step| !self.agents.has_agent(step))
        {
            return Err(PipelineError::AgentNotFound(missing.clone()));
        }
        Ok(())
    }

    async fn run(&self, ctx: PipelineContext) -> Result<Value, PipelineError> {
        info!(project = %ctx.project_name(), pipeline = %self.definition.name, "Story pipeline running");

        let mut previous_output = String::new();
        let mut steps = Vec::with_capacity(self.total_steps());

        for (index, agent_name) in self.definition.steps.iter().enumerate() {
            let output = self
                .run_step(&ctx, index + 1, agent_name, &previous_output)
                .await?;
            steps.push(json!({ "agent": agent_name, "output": output }));
            previous_output = output;

            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        // A stop requested during the last step still cancels the run.
        if ctx.checkpoint().await == Checkpoint::Cancelled {
            return Err(PipelineError::Cancelled);
        }

        Ok(json!({
            "pipeline": self.definition.name,
            "idea": self.idea,
            "steps": steps,
            "final_output": previous_output,
        }))
    }
}
