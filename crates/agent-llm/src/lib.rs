//! LLM provider abstraction layer
//!
//! Provider-agnostic types for talking to large language models:
//!
//! - Text messages and completion request/response types
//! - [`LLMProvider`] for chat completions
//! - [`EmbeddingProvider`] for dense text embeddings
//! - An OpenAI-compatible implementation of both (behind the `openai` feature)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::{EmbeddingProvider, LLMProvider};

#[cfg(feature = "openai")]
pub mod providers;
