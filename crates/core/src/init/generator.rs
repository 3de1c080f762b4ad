//! Writes a `.storyloom/` directory from the embedded templates.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::CONFIG_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Templates written by a minimal init: one pipeline and the agents its
/// steps name.
const MINIMAL_TEMPLATES: [&str; 5] = [
    "agents/plot_architect.md",
    "agents/scene_generator.md",
    "agents/continuity_checker.md",
    "agents/editor.md",
    "pipelines/chapter.yaml",
];

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory the `.storyloom/` folder is created in.
    pub target_dir: PathBuf,

    /// Overwrite an existing `.storyloom/` directory.
    pub force: bool,

    /// Only the `chapter` pipeline and its four agents.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate the `.storyloom/` structure.
///
/// ```text
/// .storyloom/
/// ├── config.toml
/// ├── agents/
/// │   ├── plot_architect.md
/// │   ├── ...
/// │   └── creative_director.md   (unless minimal)
/// └── pipelines/
///     ├── chapter.yaml
///     └── story-bible.yaml       (unless minimal)
/// ```
///
/// # Returns
///
/// The files written, relative to `.storyloom/`.
///
/// # Errors
///
/// - `DirectoryExists` if `.storyloom/` exists and `force` is not set
/// - `TemplateNotFound` if an expected template is not embedded
/// - `DirectoryCreate` / `FileWrite` on filesystem failures
///
/// # Example
///
/// ```no_run
/// use sl_core::init::{generate_storyloom_structure, InitOptions};
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = InitOptions {
///     target_dir: PathBuf::from("."),
///     force: false,
///     minimal: true,
/// };
/// let written = generate_storyloom_structure(options).await?;
/// println!("{} files written", written.len());
/// # Ok(())
/// # }
/// ```
pub async fn generate_storyloom_structure(options: InitOptions) -> InitResult<Vec<String>> {
    let root = options.target_dir.join(CONFIG_DIR);

    if root.exists() && !options.force {
        return Err(InitError::DirectoryExists(root));
    }

    for sub in ["agents", "pipelines"] {
        let dir = root.join(sub);
        fs::create_dir_all(&dir).map_err(|source| InitError::DirectoryCreate { path: dir, source })?;
    }

    let mut templates = vec!["config.toml".to_string()];
    if options.minimal {
        templates.extend(MINIMAL_TEMPLATES.iter().map(|t| t.to_string()));
    } else {
        templates.extend(list_templates("agents/"));
        templates.extend(list_templates("pipelines/"));
    }

    for template in &templates {
        write_template_file(&root, template)?;
    }

    info!(path = %root.display(), files = templates.len(), "Initialized storyloom project");
    Ok(templates)
}

fn write_template_file(root: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = root.join(template_path);
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path.clone(),
        source,
    })?;
    debug!(path = %target_path.display(), "Wrote template");
    Ok(())
}
