//! Shared helpers for the integration tests.
//!
//! - Fixtures: agent and pipeline definitions, `.storyloom/` projects
//! - Assertions and polling helpers for the threaded controller
//! - Gated and failing agents for deterministic step control

pub mod assertions;
pub mod fixtures;
pub mod mock_agents;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_agents::*;
