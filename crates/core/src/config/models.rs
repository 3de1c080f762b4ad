//! The loaded contents of a `.storyloom/` directory.

use sl_protocol::agent_models::AgentDefinition;
use sl_protocol::config_models::Settings;
use sl_protocol::pipeline_models::PipelineDefinition;

/// Settings, agents and pipelines of one project directory.
///
/// Agents and pipelines are sorted by name.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// From `config.toml`, defaults when the file is absent.
    pub settings: Settings,

    /// From `agents/*.md`.
    pub agents: Vec<AgentDefinition>,

    /// From `pipelines/*.yaml` and `pipelines/*.yml`.
    pub pipelines: Vec<PipelineDefinition>,
}

impl AppConfig {
    pub fn pipeline(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name.as_str()).collect()
    }
}
