//! Configuration loading.
//!
//! A project keeps its settings, agent definitions and pipeline definitions
//! under `.storyloom/` in the project root.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, CONFIG_DIR};
pub use models::AppConfig;
