//! Loader for the `.storyloom/` directory.
//!
//! ```text
//! .storyloom/
//! ├── config.toml          settings
//! ├── agents/*.md          agent definitions (YAML front matter + prompt)
//! └── pipelines/*.yaml     pipeline definitions
//! ```

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::AppConfig;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use sl_protocol::agent_models::AgentDefinition;
use sl_protocol::config_models::Settings;
use sl_protocol::pipeline_models::PipelineDefinition;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Name of the project configuration directory.
pub const CONFIG_DIR: &str = ".storyloom";

/// Load settings, agents and pipelines from `<root>/.storyloom/`.
///
/// Missing pieces fall back to defaults: no directory, no `config.toml`,
/// no `agents/` or no `pipelines/` is not an error.
///
/// # Arguments
///
/// * `root` - Project root containing the `.storyloom/` folder
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - A file exists but cannot be read
/// - A file has invalid TOML, YAML or front matter
/// - Two files declare the same agent or pipeline name
/// - A pipeline step names an agent with no definition
///
/// # Example
///
/// ```rust,no_run
/// use sl_core::config::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} pipelines", config.pipelines.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let config_dir = root.join(CONFIG_DIR);

    if !config_dir.exists() {
        debug!(root = %root.display(), "No .storyloom directory, using defaults");
        return Ok(AppConfig::default());
    }

    let settings = load_settings(&config_dir)?;
    let agents = load_agents(&config_dir)?;
    let pipelines = load_pipelines(&config_dir)?;

    let known: HashSet<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    for (pipeline, path) in &pipelines {
        if let Some(agent) = pipeline.steps.iter().find(|s| !known.contains(s.as_str())) {
            return Err(ConfigError::UnknownAgent {
                pipeline: pipeline.name.clone(),
                agent: agent.clone(),
                path: path.clone(),
            });
        }
    }

    debug!(
        agents = agents.len(),
        pipelines = pipelines.len(),
        "Loaded project configuration"
    );

    Ok(AppConfig {
        settings,
        agents,
        pipelines: pipelines.into_iter().map(|(p, _)| p).collect(),
    })
}

fn load_settings(config_dir: &Path) -> ConfigResult<Settings> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = read(&path)?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse { path, source })
}

fn load_agents(config_dir: &Path) -> ConfigResult<Vec<AgentDefinition>> {
    let mut seen = HashMap::new();
    let mut agents = Vec::new();

    for path in files_with_extension(&config_dir.join("agents"), &["md"])? {
        let content = read(&path)?;
        let parsed = Matter::<YAML>::new().parse(&content);

        let mut agent: AgentDefinition = parsed
            .data
            .ok_or_else(|| ConfigError::FrontMatter {
                path: path.clone(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::FrontMatter {
                path: path.clone(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;
        agent.system_prompt = parsed.content.trim().to_string();

        if seen.insert(agent.name.clone(), ()).is_some() {
            return Err(ConfigError::DuplicateName {
                kind: "agent",
                name: agent.name,
                path,
            });
        }
        agents.push(agent);
    }

    agents.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(agents)
}

fn load_pipelines(config_dir: &Path) -> ConfigResult<Vec<(PipelineDefinition, PathBuf)>> {
    let mut seen = HashSet::new();
    let mut pipelines = Vec::new();

    for path in files_with_extension(&config_dir.join("pipelines"), &["yaml", "yml"])? {
        let content = read(&path)?;
        let pipeline: PipelineDefinition =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.clone(),
                source,
            })?;

        if !seen.insert(pipeline.name.clone()) {
            return Err(ConfigError::DuplicateName {
                kind: "pipeline",
                name: pipeline.name,
                path,
            });
        }
        pipelines.push((pipeline, path));
    }

    pipelines.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
    Ok(pipelines)
}

/// Direct children of `dir` with one of `extensions`, sorted by path.
fn files_with_extension(dir: &Path, extensions: &[&str]) -> ConfigResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;
        let matches = entry
            .path()
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}
