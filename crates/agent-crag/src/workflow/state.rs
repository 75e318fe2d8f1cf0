//! Workflow states and transitions

use crate::error::{CragError, Result};
use crate::types::Tier;
use serde::Serialize;

/// Step of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Retrieving,
    Grading,
    /// Local evidence judged sufficient; no corrective search
    BranchCorrect,
    /// Local evidence judged weak; one corrective search
    BranchCorrective,
    Assembling,
    Generating,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// What a completed step reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// The step's call succeeded
    Ok,
    /// The step's call failed recoverably and a fallback was used
    Degraded,
    /// The step failed and the run must stop
    Fatal,
    /// Grading produced `correct`
    TierCorrect,
    /// Grading produced `ambiguous` or `incorrect`
    TierWeak,
}

impl Signal {
    pub fn from_tier(tier: Tier) -> Self {
        if tier.needs_correction() {
            Self::TierWeak
        } else {
            Self::TierCorrect
        }
    }
}

/// Every legal move. Anything absent is rejected by [`transition`].
pub const TRANSITIONS: &[(WorkflowState, Signal, WorkflowState)] = &[
    (WorkflowState::Retrieving, Signal::Ok, WorkflowState::Grading),
    (WorkflowState::Retrieving, Signal::Fatal, WorkflowState::Failed),
    (WorkflowState::Grading, Signal::TierCorrect, WorkflowState::BranchCorrect),
    (WorkflowState::Grading, Signal::TierWeak, WorkflowState::BranchCorrective),
    (WorkflowState::Grading, Signal::Fatal, WorkflowState::Failed),
    (WorkflowState::BranchCorrect, Signal::Ok, WorkflowState::Assembling),
    (WorkflowState::BranchCorrect, Signal::Fatal, WorkflowState::Failed),
    (WorkflowState::BranchCorrective, Signal::Ok, WorkflowState::Assembling),
    (WorkflowState::BranchCorrective, Signal::Degraded, WorkflowState::Assembling),
    (WorkflowState::BranchCorrective, Signal::Fatal, WorkflowState::Failed),
    (WorkflowState::Assembling, Signal::Ok, WorkflowState::Generating),
    (WorkflowState::Assembling, Signal::Fatal, WorkflowState::Failed),
    (WorkflowState::Generating, Signal::Ok, WorkflowState::Done),
    (WorkflowState::Generating, Signal::Fatal, WorkflowState::Failed),
];

/// Look up the state that follows `from` on `signal`
pub fn transition(from: WorkflowState, signal: Signal) -> Result<WorkflowState> {
    TRANSITIONS
        .iter()
        .find(|(state, on, _)| *state == from && *on == signal)
        .map(|(_, _, to)| *to)
        .ok_or(CragError::InvalidTransition { from, signal })
}
