//! Agent manager for resolving agents by name.
//!
//! The `AgentManager` is responsible for:
//! - Holding the agent definitions loaded from `.storyloom/agents/`
//! - Looking up agent implementations by name
//! - Providing fallback logic when agents are unavailable

use crate::agents::adapters::MockAgent;
use crate::agents::base::{Agent, AgentError, AgentStream, ExecutionContext};
use sl_protocol::agent_models::AgentDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// Manages all registered agents and provides orchestration logic.
pub struct AgentManager {
    agents: HashMap<String, Arc<dyn Agent>>,
    definitions: HashMap<String, AgentDefinition>,
    fallback_agent_name: Option<String>,
}

impl AgentManager {
    /// Create a manager with one echoing [`MockAgent`] per definition.
    ///
    /// Real model-backed agents are attached with [`AgentManager::register`].
    ///
    /// # Arguments
    ///
    /// * `definitions` - Agent definitions from `.storyloom/agents/*.md`
    pub fn new(definitions: Vec<AgentDefinition>) -> Self {
        let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
        let mut by_name = HashMap::new();

        for definition in definitions {
            agents.insert(
                definition.name.clone(),
                Arc::new(MockAgent::echo(definition.name.clone())),
            );
            by_name.insert(definition.name.clone(), definition);
        }

        Self {
            agents,
            definitions: by_name,
            fallback_agent_name: None,
        }
    }

    /// Set the fallback agent to use when the requested agent is unavailable.
    pub fn with_fallback(mut self, agent_name: impl Into<String>) -> Self {
        self.fallback_agent_name = Some(agent_name.into());
        self
    }

    /// Attach an implementation under `name`, replacing any existing one.
    pub fn register(&mut self, name: impl Into<String>, agent: Arc<dyn Agent>) {
        self.agents.insert(name.into(), agent);
    }

    pub fn get_agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    /// Definition loaded for `name`, if any.
    pub fn definition(&self, name: &str) -> Option<&AgentDefinition> {
        self.definitions.get(name)
    }

    /// Execute an instruction with the specified agent.
    ///
    /// # Behavior
    ///
    /// 1. Look up the requested agent
    /// 2. Check if it's available
    /// 3. If unavailable and a fallback is configured, try the fallback
    /// 4. Execute with the selected agent
    ///
    /// # Errors
    ///
    /// `AgentError::NotAvailable` when the agent is unknown or neither it
    /// nor the fallback is available.
    pub async fn execute(
        &self,
        agent_name: &str,
        context: &ExecutionContext,
    ) -> Result<AgentStream, AgentError> {
        let Some(agent) = self.get_agent(agent_name) else {
            return Err(AgentError::NotAvailable(format!(
                "Agent '{}' not found in registry",
                agent_name
            )));
        };

        if agent.check_availability().await {
            return agent.execute(context).await;
        }

        if let Some(fallback_name) = self.fallback_agent_name.as_deref() {
            if fallback_name != agent_name {
                if let Some(fallback_agent) = self.get_agent(fallback_name) {
                    if fallback_agent.check_availability().await {
                        return fallback_agent.execute(context).await;
                    }
                }
            }
        }

        Err(AgentError::NotAvailable(format!(
            "Agent '{}' is not available and no fallback succeeded",
            agent_name
        )))
    }

    /// All registered agent names, sorted.
    pub fn list_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_agent(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::collect_output;

    fn definition(name: &str) -> AgentDefinition {
        AgentDefinition {
            name: name.to_string(),
            description: format!("Test agent {}", name),
            model: "test-model".to_string(),
            role: "writer".to_string(),
            system_prompt: "Test prompt".to_string(),
        }
    }

    #[test]
    fn test_agent_manager_new() {
        let manager = AgentManager::new(vec![definition("editor"), definition("worldbuilder")]);
        assert!(manager.has_agent("editor"));
        assert!(manager.has_agent("worldbuilder"));
        assert!(!manager.has_agent("plot_architect"));
        assert_eq!(
            manager.definition("editor").map(|d| d.system_prompt.as_str()),
            Some("Test prompt")
        );
    }

    #[test]
    fn test_list_agents_sorted() {
        let manager = AgentManager::new(vec![
            definition("worldbuilder"),
            definition("editor"),
            definition("plot_architect"),
        ]);
        assert_eq!(
            manager.list_agents(),
            vec!["editor", "plot_architect", "worldbuilder"]
        );
    }

    #[tokio::test]
    async fn test_execute_echoes_by_default() {
        let manager = AgentManager::new(vec![definition("editor")]);
        let stream = manager
            .execute("editor", &ExecutionContext::new("Polish"))
            .await
            .unwrap();
        assert_eq!(collect_output(stream).await.unwrap(), "[editor] Polish");
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let manager = AgentManager::new(vec![definition("editor")]);
        let result = manager.execute("nobody", &ExecutionContext::new("x")).await;
        assert!(matches!(result, Err(AgentError::NotAvailable(_))));
    }

    #[tokio::test]
    async fn test_fallback_used_when_unavailable() {
        let mut manager = AgentManager::new(vec![definition("primary"), definition("backup")])
            .with_fallback("backup");
        manager.register("primary", Arc::new(MockAgent::unavailable()));

        let stream = manager
            .execute("primary", &ExecutionContext::new("Draft"))
            .await
            .unwrap();
        assert_eq!(collect_output(stream).await.unwrap(), "[backup] Draft");
    }

    #[tokio::test]
    async fn test_unavailable_without_fallback() {
        let mut manager = AgentManager::new(vec![definition("primary")]);
        manager.register("primary", Arc::new(MockAgent::unavailable()));

        let result = manager.execute("primary", &ExecutionContext::new("x")).await;
        assert!(matches!(result, Err(AgentError::NotAvailable(_))));
    }
}
