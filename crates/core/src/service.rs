//! Client command dispatch.
//!
//! `CommandService` answers protocol [`Op`]s against a [`Registry`] and a
//! loaded project configuration. It is what a transport (socket, RPC, the
//! CLI) sits on: every operation maps to one controller or feedback call
//! and one [`Reply`].

use crate::agents::AgentManager;
use crate::audit::AuditEntry;
use crate::config::AppConfig;
use crate::engine::StoryPipeline;
use crate::event_bus::payload;
use crate::feedback::FeedbackRequest;
use crate::registry::Registry;
use crate::state::controller::FEEDBACK_EVENT;
use serde_json::json;
use sl_protocol::ipc::{Op, Reply};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct CommandService<'r> {
    registry: &'r Registry,
    config: AppConfig,
    agents: Arc<AgentManager>,
    step_delay: Duration,
}

impl<'r> CommandService<'r> {
    /// Serve `config`'s pipelines with one mock agent per agent definition.
    pub fn new(registry: &'r Registry, config: AppConfig) -> Self {
        let agents = Arc::new(AgentManager::new(config.agents.clone()));
        Self::with_agents(registry, config, agents)
    }

    /// Serve `config`'s pipelines with the given agents.
    pub fn with_agents(registry: &'r Registry, config: AppConfig, agents: Arc<AgentManager>) -> Self {
        Self {
            registry,
            config,
            agents,
            step_delay: Duration::ZERO,
        }
    }

    /// Pause for `delay` after each step of every pipeline started here.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn handle(&self, op: Op) -> Reply {
        debug!(project = op.project(), ?op, "Handling operation");

        match op {
            Op::StartPipeline {
                project,
                pipeline,
                idea,
            } => self.start(&project, &pipeline, idea),

            Op::PausePipeline { project } => Reply::Ack {
                accepted: self.registry.get_pipeline_controller(&project).pause(),
            },

            Op::ResumePipeline { project } => Reply::Ack {
                accepted: self.registry.get_pipeline_controller(&project).resume(),
            },

            Op::StopPipeline { project } => Reply::Ack {
                accepted: self.registry.get_pipeline_controller(&project).stop(),
            },

            Op::InjectFeedback {
                project,
                target_agent,
                content,
                feedback_type,
                priority,
                source,
            } => {
                if content.trim().is_empty() {
                    return Reply::Rejected {
                        reason: "Feedback content must not be empty".to_string(),
                    };
                }

                let request = FeedbackRequest::new(target_agent.as_str(), content.as_str())
                    .feedback_type(feedback_type)
                    .priority(priority)
                    .source(source.as_str());
                let id = self
                    .registry
                    .get_pipeline_controller(&project)
                    .inject_feedback(request);

                self.registry.get_audit_log(&project).append(AuditEntry::new(
                    &project,
                    FEEDBACK_EVENT,
                    &source,
                    &target_agent,
                    payload([
                        ("content", json!(content)),
                        ("feedback_type", json!(feedback_type)),
                        ("priority", json!(priority)),
                        ("feedback_id", json!(id)),
                    ]),
                ));

                Reply::FeedbackQueued { id }
            }

            Op::GetStatus { project } => Reply::Status {
                snapshot: self.registry.get_pipeline_controller(&project).get_status(),
            },
        }
    }

    fn start(&self, project: &str, pipeline: &str, idea: String) -> Reply {
        let Some(definition) = self.config.pipeline(pipeline) else {
            return Reply::Rejected {
                reason: format!("Unknown pipeline '{pipeline}'"),
            };
        };

        let total_steps = definition.total_steps();
        let job = StoryPipeline::new(definition.clone(), Arc::clone(&self.agents), idea)
            .with_default_feedback_per_step(self.config.settings.feedback.per_step)
            .with_audit(self.registry.get_audit_log(project))
            .with_step_delay(self.step_delay);

        let controller = self.registry.get_pipeline_controller(project);
        match controller.start_pipeline(job, pipeline, total_steps) {
            Ok(accepted) => Reply::Ack { accepted },
            Err(e) => {
                warn!(project, pipeline, error = %e, "Pipeline start rejected");
                Reply::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }
}
