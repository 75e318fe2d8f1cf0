//! OpenAI-compatible provider
//!
//! Implements [`LLMProvider`] over `/chat/completions` and
//! [`EmbeddingProvider`] over `/embeddings`. Any server exposing the same
//! routes (Azure OpenAI, vLLM, LM Studio) works through a custom `api_base`.
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn run() -> agent_llm::Result<()> {
//! let provider = OpenAIProvider::with_config(OpenAIConfig::new("sk-...").with_timeout(60))?;
//! let request = CompletionRequest::builder("gpt-4o-mini")
//!     .add_message(Message::user("Summarise NVDA's last quarter"))
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, EmbeddingProvider, LLMError, LLMProvider, Message,
    Result, Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Configuration for the OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL (default: "https://api.openai.com/v1")
    pub api_base: String,

    /// HTTP timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Model used by [`EmbeddingProvider::embed`]
    pub embedding_model: String,
}

impl OpenAIConfig {
    /// Create a config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set HTTP timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

/// OpenAI provider for chat completions and embeddings
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Model ids visible to the configured key
    ///
    /// A cheap authenticated call, used to verify the key before any work.
    #[instrument(skip(self), fields(api_base = %self.config.api_base))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let models: ModelList = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse models: {e}")))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn post<T: Serialize + Sync>(&self, route: &str, body: &T) -> Result<Response> {
        let response = self
            .client
            .post(format!("{}/{route}", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;
        checked(response).await
    }
}

async fn checked(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await?;
    Err(status_error(status, error_text))
}

fn status_error(status: StatusCode, error_text: String) -> LLMError {
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(error_text),
        400 => LLMError::InvalidRequest(error_text),
        404 => LLMError::ModelNotFound(error_text),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(
        skip(self, request),
        fields(model = %request.model, api_base = %self.config.api_base)
    )]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = ChatRequest {
            messages: build_chat_messages(request.system.as_deref(), &request.messages),
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response: ChatResponse = self
            .post("chat/completions", &body)
            .await?
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        debug!(
            finish_reason = %choice.finish_reason,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Received chat completion"
        );

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(&choice.finish_reason),
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    #[instrument(
        skip(self, inputs),
        fields(model = %self.config.embedding_model, inputs = inputs.len())
    )]
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: inputs,
        };

        let response: EmbeddingResponse = self
            .post("embeddings", &body)
            .await?
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse embeddings: {e}")))?;

        order_embeddings(response.data, inputs.len())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// System prompt first, then the conversation in order
fn build_chat_messages(system: Option<&str>, messages: &[Message]) -> Vec<ChatMessage> {
    system
        .map(|text| ChatMessage {
            role: Role::System.as_str(),
            content: text.to_string(),
        })
        .into_iter()
        .chain(messages.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        }))
        .collect()
}

/// The API tags each vector with its input index; restore input order
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(LLMError::UnexpectedResponse(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        "stop" => StopReason::EndTurn,
        other => {
            debug!("Unknown stop reason: {other}");
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAIConfig::new("sk-test")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30)
            .with_embedding_model("text-embedding-3-large");

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.embedding_model, "text-embedding-3-large");
    }

    #[test]
    fn test_default_config() {
        let config = OpenAIConfig::default();
        assert_eq!(config.api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
    }

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::with_config(OpenAIConfig::new("sk-test")).unwrap();
        assert_eq!(LLMProvider::name(&provider), "openai");
        assert_eq!(EmbeddingProvider::name(&provider), "openai");
    }

    #[test]
    fn test_rejected_key_is_authentication_failure() {
        let err = status_error(StatusCode::UNAUTHORIZED, "invalid_api_key".to_string());
        assert!(matches!(err, LLMError::AuthenticationFailed));
        let err = status_error(StatusCode::FORBIDDEN, String::new());
        assert!(matches!(err, LLMError::AuthenticationFailed));
    }

    #[test]
    fn test_other_statuses_keep_the_body() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(err, LLMError::RateLimitExceeded(body) if body == "slow down"));
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert_eq!(
            err.to_string(),
            "API request failed: HTTP 502 Bad Gateway: upstream"
        );
    }

    #[test]
    fn test_model_list_parsing() {
        let json = r#"{"object": "list", "data": [{"id": "gpt-4o-mini", "object": "model"}]}"#;
        let models: ModelList = serde_json::from_str(json).unwrap();
        assert_eq!(models.data[0].id, "gpt-4o-mini");
    }

    #[test]
    fn test_system_prompt_goes_first() {
        let messages = vec![Message::user("What is the P/E of MSFT?")];
        let wire = build_chat_messages(Some("You are a financial analyst."), &messages);

        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content, "What is the P/E of MSFT?");
    }

    #[test]
    fn test_no_system_prompt() {
        let wire = build_chat_messages(None, &[Message::user("hi")]);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "correct"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 42, "completion_tokens": 1}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("correct"));
        assert_eq!(response.usage.prompt_tokens, 42);
    }

    #[test]
    fn test_embeddings_restored_to_input_order() {
        let data = vec![
            EmbeddingData {
                index: 1,
                embedding: vec![0.0, 1.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![1.0, 0.0],
            },
        ];
        let ordered = order_embeddings(data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_embedding_count_mismatch() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![1.0],
        }];
        assert!(matches!(
            order_embeddings(data, 2),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(map_stop_reason("mystery"), StopReason::EndTurn);
    }

    #[tokio::test]
    async fn test_empty_embedding_batch_skips_request() {
        let provider = OpenAIProvider::with_config(
            OpenAIConfig::new("sk-test").with_api_base("http://127.0.0.1:9"),
        )
        .unwrap();
        let vectors = provider.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
