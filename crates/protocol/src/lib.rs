//! # sl-protocol
//!
//! Core protocol definitions and data models for storyloom.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (YAML pipelines, TOML settings, Markdown agents)
//! - Coordination records (bus events, feedback messages)
//! - Runtime pipeline status snapshots
//! - Commands and notifications exchanged with a UI or remote client
//!
//! ## Modules
//!
//! - [`agent_models`]: Agent definition structures
//! - [`config_models`]: Project settings from config.toml
//! - [`event_models`]: Event bus records
//! - [`feedback_models`]: Human-in-the-loop feedback messages
//! - [`pipeline_models`]: Pipeline definitions
//! - [`process_models`]: Runtime pipeline status and progress
//! - [`ipc`]: Operations, replies and notifications for clients
//!
//! ## Design Principles
//!
//! - Minimal dependencies: serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other storyloom crates

pub mod agent_models;
pub mod config_models;
pub mod event_models;
pub mod feedback_models;
pub mod ipc;
pub mod pipeline_models;
pub mod process_models;

// Re-export all public types for convenience
pub use agent_models::*;
pub use config_models::*;
pub use event_models::*;
pub use feedback_models::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use process_models::*;
