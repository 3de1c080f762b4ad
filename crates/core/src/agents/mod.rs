//! Agent abstraction and management.
//!
//! This module provides the `Agent` trait (Adapter Pattern) and
//! the `AgentManager` that resolves agents named in pipeline steps.

pub mod adapters;
pub mod base;
pub mod manager;

pub use adapters::MockAgent;
pub use base::{collect_output, Agent, AgentError, AgentEvent, AgentStream, ExecutionContext};
pub use manager::AgentManager;
