//! Outcome kinds for external calls
//!
//! Every collaborator call in a run resolves to one of three kinds. The
//! workflow branches on the kind alone, never on error text.

use crate::error::{CragError, Result};
use crate::workflow::Signal;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// A non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// The judgment call failed or answered with an unusable label
    GradingDegraded(String),
    /// The corrective search failed; the run continued without web evidence
    CorrectiveSearchDegraded(String),
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GradingDegraded(reason) => write!(f, "grading degraded: {reason}"),
            Self::CorrectiveSearchDegraded(reason) => {
                write!(f, "corrective search degraded: {reason}")
            }
        }
    }
}

/// Result of one external call, classified
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call succeeded
    Ok(T),
    /// The call failed in a recoverable way; `value` is the safe fallback
    Degraded { value: T, reason: Degradation },
    /// The call failed and the run cannot continue
    Fatal(CragError),
}

impl<T> CallOutcome<T> {
    /// Turn a call result into an outcome, substituting `fallback` on error
    pub fn degrade_on_error(
        result: Result<T>,
        fallback: impl FnOnce() -> T,
        reason: impl FnOnce(&CragError) -> Degradation,
    ) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(err) => Self::Degraded {
                reason: reason(&err),
                value: fallback(),
            },
        }
    }

    /// Workflow signal carried by this outcome
    pub fn signal(&self) -> Signal {
        match self {
            Self::Ok(_) => Signal::Ok,
            Self::Degraded { .. } => Signal::Degraded,
            Self::Fatal(_) => Signal::Fatal,
        }
    }

    /// Split into the usable value and the degradation, if any
    pub fn into_parts(self) -> Result<(T, Option<Degradation>)> {
        match self {
            Self::Ok(value) => Ok((value, None)),
            Self::Degraded { value, reason } => Ok((value, Some(reason))),
            Self::Fatal(err) => Err(err),
        }
    }
}

/// Run `call` under a time budget; overrunning is reported as [`CragError::Timeout`]
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CragError::Timeout {
            operation,
            after: limit,
        }),
    }
}
