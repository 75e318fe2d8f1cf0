//! [`AnswerService`] backed by a chat-completion provider

use super::{AnswerService, ServiceCheck};
use crate::error::{CragError, Result};
use agent_llm::providers::OpenAIProvider;
use agent_llm::{CompletionRequest, LLMProvider, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Settings for one answer service instance
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            system_prompt: crate::prompts::ANALYST_SYSTEM_PROMPT.to_string(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Sends each prompt as a single user turn under a fixed system prompt
///
/// Grading and answer generation each get their own instance, so the two
/// never share a system prompt or a request.
pub struct LlmAnswerService {
    provider: Arc<dyn LLMProvider>,
    config: AnswerConfig,
}

impl LlmAnswerService {
    pub fn new(provider: Arc<dyn LLMProvider>, config: AnswerConfig) -> Self {
        Self { provider, config }
    }
}

#[async_trait]
impl AnswerService for LlmAnswerService {
    #[instrument(skip_all, fields(provider = self.provider.name(), model = %self.config.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest::builder(&self.config.model)
            .add_message(Message::user(prompt))
            .system(self.config.system_prompt.clone())
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .build();

        let response = self.provider.complete(request).await?;
        debug!(
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "Completion received"
        );

        let text = response.text().trim();
        if text.is_empty() {
            return Err(CragError::LlmError(agent_llm::LLMError::UnexpectedResponse(
                "empty completion".to_string(),
            )));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl ServiceCheck for OpenAIProvider {
    fn credential(&self) -> &'static str {
        "OPENAI_API_KEY"
    }

    async fn verify(&self) -> Result<()> {
        self.list_models().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_llm::{CompletionResponse, LLMError, StopReason, TokenUsage};
    use std::sync::Mutex;

    struct MockProvider {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl MockProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> agent_llm::Result<CompletionResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(CompletionResponse {
                message: Message::assistant(self.reply.clone()),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> agent_llm::Result<CompletionResponse> {
            Err(LLMError::RateLimitExceeded("try later".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_default_config() {
        let config = AnswerConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.0);
        assert!(config.system_prompt.contains("financial analyst"));
    }

    #[tokio::test]
    async fn test_prompt_sent_as_single_user_turn() {
        let provider = MockProvider::replying("  Revenue grew 8%.  ");
        let service = LlmAnswerService::new(
            provider.clone(),
            AnswerConfig {
                system_prompt: "Grade it.".to_string(),
                max_tokens: 16,
                ..AnswerConfig::default()
            },
        );

        let text = service.generate("Question: ...").await.unwrap();
        assert_eq!(text, "Revenue grew 8%.");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages, vec![Message::user("Question: ...")]);
        assert_eq!(seen[0].system.as_deref(), Some("Grade it."));
        assert_eq!(seen[0].max_tokens, 16);
        assert_eq!(seen[0].temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_blank_completion_is_an_error() {
        let service = LlmAnswerService::new(MockProvider::replying("   "), AnswerConfig::default());
        assert!(matches!(
            service.generate("anything").await,
            Err(CragError::LlmError(LLMError::UnexpectedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let service = LlmAnswerService::new(Arc::new(FailingProvider), AnswerConfig::default());
        let err = service.generate("anything").await.unwrap_err();
        assert!(matches!(err, CragError::LlmError(LLMError::RateLimitExceeded(_))));
    }
}
