//! Project scaffolding.
//!
//! Writes a `.storyloom/` directory with default settings, the seven
//! creative agent definitions and two starter pipelines.

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_storyloom_structure, InitOptions};
pub use templates::{get_template, list_templates};
