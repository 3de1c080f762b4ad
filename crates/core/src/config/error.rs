//! Errors raised while reading a `.storyloom/` directory.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid pipeline definition in {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Missing or malformed YAML front matter in an agent file.
    #[error("Invalid agent front matter in {path}: {reason}")]
    FrontMatter { path: PathBuf, reason: String },

    #[error("Failed to traverse directory {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// Two agent files or two pipeline files declare the same name.
    #[error("Duplicate {kind} name '{name}' in {path}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        path: PathBuf,
    },

    /// A pipeline step names an agent with no definition file.
    #[error("Pipeline '{pipeline}' in {path} uses undefined agent '{agent}'")]
    UnknownAgent {
        pipeline: String,
        agent: String,
        path: PathBuf,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
