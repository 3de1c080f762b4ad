//! Test fixtures for definitions and project directories.

use sl_core::agents::AgentManager;
use sl_core::config::CONFIG_DIR;
use sl_protocol::agent_models::AgentDefinition;
use sl_protocol::pipeline_models::PipelineDefinition;
use tempfile::TempDir;

/// The four steps of the starter `chapter` pipeline.
#[allow(dead_code)]
pub const CHAPTER_STEPS: [&str; 4] = [
    "plot_architect",
    "scene_generator",
    "continuity_checker",
    "editor",
];

#[allow(dead_code)]
pub fn create_test_agent(name: &str) -> AgentDefinition {
    AgentDefinition {
        name: name.to_string(),
        description: format!("Test {name}"),
        model: "mock".to_string(),
        role: "tester".to_string(),
        system_prompt: "You are a test agent.".to_string(),
    }
}

#[allow(dead_code)]
pub fn create_test_pipeline(name: &str, steps: &[&str]) -> PipelineDefinition {
    PipelineDefinition::new(name, steps.iter().map(|s| s.to_string()).collect())
}

/// Echoing mock agents for every name in `steps`.
#[allow(dead_code)]
pub fn create_agent_manager(steps: &[&str]) -> AgentManager {
    AgentManager::new(steps.iter().map(|s| create_test_agent(s)).collect())
}

/// A temporary project with a `.storyloom/` holding the chapter agents
/// and pipeline. Keep the `TempDir` alive for the test's duration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path().join(CONFIG_DIR);
    std::fs::create_dir_all(root.join("agents"))?;
    std::fs::create_dir_all(root.join("pipelines"))?;

    std::fs::write(root.join("config.toml"), "[feedback]\nper_step = 2\n")?;

    for name in CHAPTER_STEPS {
        let agent = format!(
            "---\nname: {name}\ndescription: Test {name}\nmodel: mock\n---\n\nYou are {name}."
        );
        std::fs::write(root.join("agents").join(format!("{name}.md")), agent)?;
    }

    let pipeline = format!(
        "name: chapter\ndescription: Test chapter\nsteps:\n{}",
        CHAPTER_STEPS
            .iter()
            .map(|s| format!("  - {s}\n"))
            .collect::<String>()
    );
    std::fs::write(root.join("pipelines/chapter.yaml"), pipeline)?;

    Ok(temp_dir)
}
