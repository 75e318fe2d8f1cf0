//! Provider trait definitions

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for chat-completion providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;
}

/// Trait for text-embedding providers
///
/// Implementations return one vector per input, in input order. All vectors
/// returned by one provider share the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
