//! Corrective retrieval workflow
//!
//! [`state`] holds the states and the transition table; [`orchestrator`]
//! drives one question through them.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Orchestrator, OrchestratorSettings, RunReport};
pub use state::{Signal, TRANSITIONS, WorkflowState, transition};
