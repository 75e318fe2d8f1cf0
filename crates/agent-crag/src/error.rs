//! Error types for corrective retrieval operations
//!
//! Only three kinds end a question or a session: [`CragError::EvidenceUnavailable`],
//! [`CragError::GenerationFailed`] and [`CragError::ConfigurationMissing`].
//! Recoverable problems during a run are recorded as
//! [`Degradation`](crate::outcome::Degradation) values instead.

use crate::workflow::{Signal, WorkflowState};
use std::time::Duration;
use thiserror::Error;

/// Corrective RAG errors
#[derive(Debug, Error)]
pub enum CragError {
    /// Evidence search failed or timed out
    #[error("Evidence unavailable: {0}")]
    EvidenceUnavailable(String),

    /// Answer generation failed or timed out
    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    /// Required settings are absent
    #[error("Missing: {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),

    /// Settings are present but unusable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ticker failed normalisation
    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),

    /// Data not available for the requested ticker
    #[error("Data not available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    /// A question was asked before any ticker was set up
    #[error("No ticker loaded. Run `setup <TICKER>` first")]
    NotReady,

    /// Document rejected by the evidence store
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Credential rejected by an API
    #[error("{provider} rejected the API key")]
    Unauthorized { provider: String },

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// An external call exceeded its time budget
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The workflow tried a move its transition table does not allow
    #[error("Workflow cannot leave {from:?} on {signal:?}")]
    InvalidTransition {
        from: WorkflowState,
        signal: Signal,
    },

    /// Unrecognised shell command
    #[error("Command error: {0}")]
    CommandError(String),

    /// Prompt template failed to render
    #[error("Prompt error: {0}")]
    PromptError(#[from] minijinja::Error),

    /// LLM provider error
    #[error("LLM error: {0}")]
    LlmError(#[from] agent_llm::LLMError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for corrective RAG operations
pub type Result<T> = std::result::Result<T, CragError>;

impl CragError {
    /// The service refused the credential or could not be reached at all
    pub fn denies_access(&self) -> bool {
        match self {
            Self::Unauthorized { .. }
            | Self::LlmError(agent_llm::LLMError::AuthenticationFailed)
            | Self::Timeout { .. } => true,
            Self::LlmError(agent_llm::LLMError::HttpError(e)) | Self::NetworkError(e) => {
                e.is_connect() || e.is_timeout()
            }
            _ => false,
        }
    }

    pub(crate) fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}
