//! Pipeline run state and control.
//!
//! This module provides:
//! - The controller state machine and its transition functions
//! - `PipelineController`, which drives one job per project on a background thread
//! - The `PipelineJob` trait and the `PipelineContext` checkpoint API jobs call into

pub mod context;
pub mod controller;
pub mod error;
pub mod job;
pub mod process;
pub mod signal;

pub use context::{Checkpoint, PipelineContext};
pub use controller::PipelineController;
pub use error::{ControllerError, PipelineError};
pub use job::{pipeline_fn, FnJob, PipelineJob};
pub use signal::RunSignal;
