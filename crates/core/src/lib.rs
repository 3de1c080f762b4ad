//! # sl-core
//!
//! Real-time coordination core for storyloom's multi-agent story pipelines.
//!
//! This crate provides:
//! - A per-project event bus with a bounded history
//! - A prioritized feedback queue consumed by agents between steps
//! - A pipeline controller that runs one pipeline per project on a
//!   background thread with pause, resume and stop
//! - A registry handing out one instance of each component per project
//!
//! Around that core sit the notification hub, the audit sink, the agent
//! abstraction, the story pipeline engine, `.storyloom/` configuration and
//! project scaffolding.
//!
//! ## Modules
//!
//! - [`event_bus`]: Publish/subscribe with a ring buffer of recent events
//! - [`feedback`]: Feedback queue and statistics
//! - [`state`]: Pipeline controller, run state machine and job trait
//! - [`registry`]: Project-scoped component directory
//! - [`realtime`]: Outbound notification hub
//! - [`audit`]: Append-only activity history
//! - [`agents`]: Agent trait and adapters
//! - [`engine`]: Story pipeline job
//! - [`config`]: `.storyloom/` loading
//! - [`init`]: `.storyloom/` scaffolding
//! - [`service`]: Protocol operation dispatch

pub mod agents;
pub mod audit;
pub mod config;
pub mod engine;
pub mod event_bus;
pub mod feedback;
pub mod init;
pub mod realtime;
pub mod registry;
pub mod service;
pub mod state;
