//! Configuration for CRAG sessions

use crate::error::{CragError, Result};
use agent_utils::{EnvError, env_parse, env_var, missing_vars};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Keys without which a session cannot start
pub const REQUIRED_KEYS: [&str; 3] = ["OPENAI_API_KEY", "NEWSAPI_API_KEY", "TAVILY_API_KEY"];

/// Where document and query embeddings come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAI,
    /// Offline hashed bag-of-words
    Lexical,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "lexical" => Ok(Self::Lexical),
            other => Err(format!("expected `openai` or `lexical`, got `{other}`")),
        }
    }
}

/// API keys, model choices and tunables for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CragConfig {
    pub openai_api_key: String,
    pub newsapi_api_key: String,
    pub tavily_api_key: String,
    /// Enables company fundamentals in the market data document
    pub alpha_vantage_api_key: Option<String>,

    /// OpenAI-compatible endpoint; `None` means api.openai.com
    pub openai_api_base: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub embeddings: EmbeddingBackend,
    pub temperature: f32,
    pub max_tokens: usize,

    /// Documents retrieved per question
    pub top_k: usize,
    pub grading_max_documents: usize,
    pub grading_max_chars: usize,
    pub corrective_local_documents: usize,
    pub corrective_local_chars: usize,
    pub corrective_max_results: usize,

    pub news_window_days: i64,
    pub news_page_size: u32,
    pub news_rate_limit: u32,
    pub alpha_vantage_rate_limit: u32,
    pub tavily_rate_limit: u32,
    pub market_cache_ttl: Duration,

    pub store_timeout: Duration,
    pub grading_timeout: Duration,
    pub corrective_timeout: Duration,
    pub generation_timeout: Duration,
    /// Bound on fetching market data and news during setup
    pub setup_timeout: Duration,
}

impl Default for CragConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            newsapi_api_key: String::new(),
            tavily_api_key: String::new(),
            alpha_vantage_api_key: None,
            openai_api_base: None,
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embeddings: EmbeddingBackend::OpenAI,
            temperature: 0.0,
            max_tokens: 1024,
            top_k: 5,
            grading_max_documents: 3,
            grading_max_chars: 500,
            corrective_local_documents: 2,
            corrective_local_chars: 800,
            corrective_max_results: 3,
            news_window_days: 7,
            news_page_size: 10,
            news_rate_limit: 60,
            alpha_vantage_rate_limit: 5,
            tavily_rate_limit: 60,
            market_cache_ttl: Duration::from_secs(60),
            store_timeout: Duration::from_secs(10),
            grading_timeout: Duration::from_secs(30),
            corrective_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(120),
            setup_timeout: Duration::from_secs(60),
        }
    }
}

impl CragConfig {
    /// Create a new configuration builder
    pub fn builder() -> CragConfigBuilder {
        CragConfigBuilder::default()
    }

    /// Load keys and overrides from the environment
    ///
    /// All missing required keys are reported together.
    pub fn from_env() -> Result<Self> {
        let missing = missing_vars(&REQUIRED_KEYS);
        if !missing.is_empty() {
            return Err(CragError::ConfigurationMissing(missing));
        }

        let mut builder = Self::builder()
            .openai_api_key(env_var("OPENAI_API_KEY").unwrap_or_default())
            .newsapi_api_key(env_var("NEWSAPI_API_KEY").unwrap_or_default())
            .tavily_api_key(env_var("TAVILY_API_KEY").unwrap_or_default());

        if let Some(key) = env_var("ALPHA_VANTAGE_API_KEY") {
            builder = builder.alpha_vantage_api_key(key);
        }
        if let Some(base) = env_var("OPENAI_API_BASE") {
            builder = builder.openai_api_base(base);
        }
        if let Some(model) = env_var("OPENAI_MODEL") {
            builder = builder.model(model);
        }
        if let Some(model) = env_var("OPENAI_EMBEDDING_MODEL") {
            builder = builder.embedding_model(model);
        }
        if let Some(top_k) = env_parse::<usize>("CRAG_TOP_K").map_err(env_error)? {
            builder = builder.top_k(top_k);
        }
        if let Some(backend) =
            env_parse::<EmbeddingBackend>("CRAG_EMBEDDINGS").map_err(env_error)?
        {
            builder = builder.embeddings(backend);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .zip([&self.openai_api_key, &self.newsapi_api_key, &self.tavily_api_key])
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CragError::ConfigurationMissing(missing));
        }

        if self.top_k == 0 {
            return Err(CragError::ConfigError("top_k must be greater than 0".to_string()));
        }

        let timeouts = [
            ("store_timeout", self.store_timeout),
            ("grading_timeout", self.grading_timeout),
            ("corrective_timeout", self.corrective_timeout),
            ("generation_timeout", self.generation_timeout),
            ("setup_timeout", self.setup_timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, t)| t.is_zero()) {
            return Err(CragError::ConfigError(format!("{name} must be greater than 0")));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CragError::ConfigError(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

fn env_error(err: EnvError) -> CragError {
    CragError::ConfigError(err.to_string())
}

/// Builder for CragConfig
#[derive(Debug, Default)]
pub struct CragConfigBuilder {
    openai_api_key: Option<String>,
    newsapi_api_key: Option<String>,
    tavily_api_key: Option<String>,
    alpha_vantage_api_key: Option<String>,
    openai_api_base: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    embeddings: Option<EmbeddingBackend>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    top_k: Option<usize>,
    store_timeout: Option<Duration>,
    grading_timeout: Option<Duration>,
    corrective_timeout: Option<Duration>,
    generation_timeout: Option<Duration>,
    market_cache_ttl: Option<Duration>,
}

impl CragConfigBuilder {
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn newsapi_api_key(mut self, key: impl Into<String>) -> Self {
        self.newsapi_api_key = Some(key.into());
        self
    }

    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    pub fn alpha_vantage_api_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_api_key = Some(key.into());
        self
    }

    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.openai_api_base = Some(base.into());
        self
    }

    /// Chat model used for grading and generation
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn embeddings(mut self, backend: EmbeddingBackend) -> Self {
        self.embeddings = Some(backend);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn grading_timeout(mut self, timeout: Duration) -> Self {
        self.grading_timeout = Some(timeout);
        self
    }

    pub fn corrective_timeout(mut self, timeout: Duration) -> Self {
        self.corrective_timeout = Some(timeout);
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = Some(timeout);
        self
    }

    pub fn market_cache_ttl(mut self, ttl: Duration) -> Self {
        self.market_cache_ttl = Some(ttl);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CragConfig> {
        let defaults = CragConfig::default();

        let config = CragConfig {
            openai_api_key: self.openai_api_key.unwrap_or(defaults.openai_api_key),
            newsapi_api_key: self.newsapi_api_key.unwrap_or(defaults.newsapi_api_key),
            tavily_api_key: self.tavily_api_key.unwrap_or(defaults.tavily_api_key),
            alpha_vantage_api_key: self.alpha_vantage_api_key.or(defaults.alpha_vantage_api_key),
            openai_api_base: self.openai_api_base.or(defaults.openai_api_base),
            model: self.model.unwrap_or(defaults.model),
            embedding_model: self.embedding_model.unwrap_or(defaults.embedding_model),
            embeddings: self.embeddings.unwrap_or(defaults.embeddings),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            store_timeout: self.store_timeout.unwrap_or(defaults.store_timeout),
            grading_timeout: self.grading_timeout.unwrap_or(defaults.grading_timeout),
            corrective_timeout: self.corrective_timeout.unwrap_or(defaults.corrective_timeout),
            generation_timeout: self.generation_timeout.unwrap_or(defaults.generation_timeout),
            market_cache_ttl: self.market_cache_ttl.unwrap_or(defaults.market_cache_ttl),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> CragConfigBuilder {
        CragConfig::builder()
            .openai_api_key("sk-test")
            .newsapi_api_key("news-test")
            .tavily_api_key("tvly-test")
    }

    #[test]
    fn test_default_config() {
        let config = CragConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.generation_timeout, Duration::from_secs(120));
        assert!(config.generation_timeout > config.store_timeout);
        assert!(config.generation_timeout > config.corrective_timeout);
    }

    #[test]
    fn test_default_config_lacks_keys() {
        let err = CragConfig::default().validate().unwrap_err();
        match err {
            CragError::ConfigurationMissing(names) => assert_eq!(names, REQUIRED_KEYS),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_builder() {
        let config = keyed()
            .model("gpt-4o")
            .top_k(8)
            .embeddings(EmbeddingBackend::Lexical)
            .generation_timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.embeddings, EmbeddingBackend::Lexical);
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
        assert_eq!(config.corrective_max_results, 3);
    }

    #[test]
    fn test_missing_keys_listed_together() {
        let err = CragConfig::builder()
            .newsapi_api_key("news-test")
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing: OPENAI_API_KEY, TAVILY_API_KEY");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(matches!(
            keyed().top_k(0).build(),
            Err(CragError::ConfigError(_))
        ));
        assert!(matches!(
            keyed().store_timeout(Duration::ZERO).build(),
            Err(CragError::ConfigError(msg)) if msg.contains("store_timeout")
        ));
        assert!(matches!(
            keyed().temperature(3.5).build(),
            Err(CragError::ConfigError(_))
        ));
    }

    #[test]
    fn test_embedding_backend_from_str() {
        assert_eq!("OpenAI".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::OpenAI));
        assert_eq!(" lexical ".parse::<EmbeddingBackend>(), Ok(EmbeddingBackend::Lexical));
        assert!("faiss".parse::<EmbeddingBackend>().is_err());
    }
}
