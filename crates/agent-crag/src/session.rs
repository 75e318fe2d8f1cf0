//! A single-ticker CRAG session
//!
//! `setup` indexes fresh evidence for one ticker and makes it current; `ask`
//! runs questions against whichever ticker is current.

use crate::api::{
    AlphaVantageClient, MarketDataService, MarketDataSource, MarketSnapshot, NewsApiClient,
    NewsItem, NewsSource, TavilySearch, YahooFinanceClient,
};
use crate::assembler::ContextAssembler;
use crate::config::{CragConfig, EmbeddingBackend};
use crate::error::{CragError, Result};
use crate::evaluator::RetrievalEvaluator;
use crate::outcome::with_timeout;
use crate::prompts::{ANALYST_SYSTEM_PROMPT, GRADER_SYSTEM_PROMPT};
use crate::services::answer::AnswerConfig;
use crate::services::{
    AnswerService, CorrectiveSearchProvider, EvidenceStore, LlmAnswerService, ServiceCheck,
};
use crate::store::{InMemoryEvidenceStore, LexicalEmbedder, TickerLocks};
use crate::types::{Answer, Document, DocumentSource, Question, normalize_ticker};
use crate::workflow::{Orchestrator, OrchestratorSettings, RunReport};
use agent_llm::EmbeddingProvider;
use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Label replies are a single word
const GRADER_MAX_TOKENS: usize = 16;

/// Collaborators a session is built from
pub struct SessionComponents {
    pub market: Arc<dyn MarketDataSource>,
    pub news: Arc<dyn NewsSource>,
    pub store: Arc<dyn EvidenceStore>,
    /// Grades retrieval; must be separate from `generator`
    pub judge: Arc<dyn AnswerService>,
    pub corrective: Arc<dyn CorrectiveSearchProvider>,
    pub generator: Arc<dyn AnswerService>,
    /// Credentials verified by [`CragSession::preflight`]
    pub checks: Vec<Arc<dyn ServiceCheck>>,
}

/// What one setup indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupSummary {
    pub ticker: String,
    pub company: String,
    pub documents: usize,
    pub news_items: usize,
    /// Set when headlines could not be fetched
    pub news_error: Option<String>,
}

pub struct CragSession {
    market: Arc<dyn MarketDataSource>,
    news: Arc<dyn NewsSource>,
    store: Arc<dyn EvidenceStore>,
    orchestrator: Orchestrator,
    checks: Vec<Arc<dyn ServiceCheck>>,
    locks: TickerLocks,
    current: RwLock<Option<String>>,
    setup_timeout: Duration,
    store_timeout: Duration,
}

impl CragSession {
    pub fn new(components: SessionComponents, config: &CragConfig) -> Self {
        let locks = TickerLocks::new();
        let evaluator = RetrievalEvaluator::new(components.judge)
            .with_timeout(config.grading_timeout)
            .with_excerpt_limits(config.grading_max_documents, config.grading_max_chars);
        let orchestrator = Orchestrator::new(
            Arc::clone(&components.store),
            evaluator,
            components.corrective,
            components.generator,
            ContextAssembler::new(config.corrective_local_documents, config.corrective_local_chars),
            locks.clone(),
            OrchestratorSettings::from_config(config),
        );

        Self {
            market: components.market,
            news: components.news,
            store: components.store,
            orchestrator,
            checks: components.checks,
            locks,
            current: RwLock::new(None),
            setup_timeout: config.setup_timeout,
            store_timeout: config.store_timeout,
        }
    }

    /// Wire the production adapters described by `config`
    pub fn from_config(config: &CragConfig) -> Result<Self> {
        config.validate()?;

        let mut openai = OpenAIConfig::new(&config.openai_api_key)
            .with_embedding_model(&config.embedding_model)
            .with_timeout(config.generation_timeout.as_secs().max(1));
        if let Some(base) = &config.openai_api_base {
            openai = openai.with_api_base(base);
        }
        let provider = Arc::new(OpenAIProvider::with_config(openai)?);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings {
            EmbeddingBackend::OpenAI => provider.clone(),
            EmbeddingBackend::Lexical => Arc::new(LexicalEmbedder::default()),
        };

        let judge = LlmAnswerService::new(
            provider.clone(),
            AnswerConfig {
                model: config.model.clone(),
                system_prompt: GRADER_SYSTEM_PROMPT.to_string(),
                max_tokens: GRADER_MAX_TOKENS,
                temperature: 0.0,
            },
        );
        let generator = LlmAnswerService::new(
            provider.clone(),
            AnswerConfig {
                model: config.model.clone(),
                system_prompt: ANALYST_SYSTEM_PROMPT.to_string(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        );

        let alpha_vantage = config
            .alpha_vantage_api_key
            .as_ref()
            .map(|key| AlphaVantageClient::new(key, config.alpha_vantage_rate_limit));
        let market = MarketDataService::new(
            YahooFinanceClient::default(),
            alpha_vantage,
            config.market_cache_ttl,
        );
        let news = NewsApiClient::new(&config.newsapi_api_key, config.news_rate_limit)
            .with_window(config.news_window_days, config.news_page_size);
        let corrective = Arc::new(TavilySearch::new(
            &config.tavily_api_key,
            config.tavily_rate_limit,
            config.corrective_max_results,
            config.corrective_timeout,
        ));
        let checks: Vec<Arc<dyn ServiceCheck>> = vec![provider.clone(), corrective.clone()];

        info!(
            model = %config.model,
            embeddings = ?config.embeddings,
            fundamentals = config.alpha_vantage_api_key.is_some(),
            "Session configured"
        );

        Ok(Self::new(
            SessionComponents {
                market: Arc::new(market),
                news: Arc::new(news),
                store: Arc::new(InMemoryEvidenceStore::new(embedder)),
                judge: Arc::new(judge),
                corrective,
                generator: Arc::new(generator),
                checks,
            },
            config,
        ))
    }

    /// Verify every remote credential before the first question
    ///
    /// A rejected key or an unreachable service is reported as
    /// [`CragError::ConfigurationMissing`], naming each failing setting.
    /// Inconclusive failures such as rate limits are logged and let through.
    #[instrument(skip(self), fields(checks = self.checks.len()))]
    pub async fn preflight(&self) -> Result<()> {
        let mut rejected = Vec::new();
        for check in &self.checks {
            let credential = check.credential();
            match with_timeout(self.setup_timeout, "credential check", check.verify()).await {
                Ok(()) => debug!(credential, "Credential accepted"),
                Err(e) if e.denies_access() => {
                    warn!(credential, error = %e, "Credential unusable");
                    rejected.push(format!("{credential} ({e})"));
                }
                Err(e) => warn!(credential, error = %e, "Credential check inconclusive"),
            }
        }

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(CragError::ConfigurationMissing(rejected))
        }
    }

    /// Fetch and index evidence for `raw_ticker`, then make it current
    ///
    /// Market data is required. Missing headlines are logged and the ticker
    /// is indexed without them. On error the previous index and current
    /// ticker stay as they were; on success the previous ticker's index is
    /// dropped.
    #[instrument(skip(self))]
    pub async fn setup(&self, raw_ticker: &str) -> Result<SetupSummary> {
        let ticker = normalize_ticker(raw_ticker)?;
        let lease = self.locks.write(&ticker).await;

        let snapshot = with_timeout(
            self.setup_timeout,
            "market data fetch",
            self.market.snapshot(&ticker),
        )
        .await?;
        let company = snapshot.company_name().to_string();

        let (news, news_error) =
            match with_timeout(self.setup_timeout, "news fetch", self.news.recent(&company)).await {
                Ok(items) => (items, None),
                Err(e) => {
                    warn!(error = %e, "Headlines unavailable, indexing market data only");
                    (Vec::new(), Some(e.to_string()))
                }
            };

        let documents = build_documents(&ticker, &snapshot, &news);
        let count = documents.len();
        with_timeout(
            self.store_timeout,
            "evidence indexing",
            self.store.upsert(&ticker, documents),
        )
        .await?;

        let previous = self.current.write().await.replace(ticker.clone());
        drop(lease);
        info!(ticker, documents = count, "Ticker ready");

        if let Some(previous) = previous.filter(|p| *p != ticker) {
            self.retire(&previous).await;
        }

        Ok(SetupSummary {
            ticker,
            company,
            documents: count,
            news_items: news.len(),
            news_error,
        })
    }

    /// Answer a question about the current ticker
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_report(question).await?.outcome
    }

    /// Like [`ask`](Self::ask), keeping the full run report
    pub async fn ask_with_report(&self, question: &str) -> Result<RunReport> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CragError::CommandError("Question is empty".to_string()));
        }
        let ticker = self.current_ticker().await.ok_or(CragError::NotReady)?;
        Ok(self.orchestrator.run(&Question::new(ticker, question)).await)
    }

    pub async fn current_ticker(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Drop a ticker's index once no run is reading it, unless it became current again
    async fn retire(&self, ticker: &str) {
        let _lease = self.locks.write(ticker).await;
        if self.current.read().await.as_deref() == Some(ticker) {
            return;
        }
        let removed = with_timeout(
            self.store_timeout,
            "evidence removal",
            self.store.remove(ticker),
        )
        .await;
        if let Err(e) = removed {
            warn!(ticker, error = %e, "Previous index kept");
        }
    }
}

/// One market data document plus one document per headline
fn build_documents(ticker: &str, snapshot: &MarketSnapshot, news: &[NewsItem]) -> Vec<Document> {
    let mut documents = Vec::with_capacity(news.len() + 1);
    documents.push(Document::new(
        format!("{ticker}:{}", DocumentSource::MarketData.as_str()),
        DocumentSource::MarketData,
        ticker,
        snapshot.render(),
    ));
    documents.extend(news.iter().enumerate().map(|(i, item)| {
        Document::new(
            format!("{ticker}:{}:{i:02}", DocumentSource::News.as_str()),
            DocumentSource::News,
            ticker,
            item.render(),
        )
    }));
    documents
}
