//! Corrective retrieval-augmented Q&A over stock market evidence
//!
//! A question about the loaded ticker goes through one fixed workflow:
//!
//! - retrieve the top documents from the ticker's evidence index
//! - grade them `correct`, `ambiguous` or `incorrect`
//! - on a weak grade, search the web once for corrective snippets
//! - assemble a context and generate the answer
//!
//! Grading and web search failures never stop a run. They push it toward
//! gathering more evidence. Only a failed evidence search, a failed
//! generation or missing configuration are reported as errors.
//!
//! # Architecture
//!
//! The [`Orchestrator`] depends only on the capability traits in
//! [`services`]: [`EvidenceStore`], [`CorrectiveSearchProvider`] and
//! [`AnswerService`]. Production adapters live in [`store`] (in-memory
//! cosine index), [`api`] (Yahoo Finance, Alpha Vantage, NewsAPI, Tavily)
//! and [`services::answer`] (chat completions). [`CragSession`] wires them
//! together and adds ticker setup; [`bot`] is the interactive shell on top.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_crag::{CragConfig, CragSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CragConfig::from_env()?;
//!     let session = CragSession::from_config(&config)?;
//!
//!     session.setup("AAPL").await?;
//!     let answer = session.ask("What is the P/E ratio?").await?;
//!     println!("[{}] {}", answer.tier_used, answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assembler;
pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod outcome;
pub mod prompts;
pub mod services;
pub mod session;
pub mod store;
pub mod text;
pub mod types;
pub mod workflow;

// Re-export main types for convenience
pub use assembler::ContextAssembler;
pub use bot::CragBot;
pub use config::{CragConfig, EmbeddingBackend};
pub use error::{CragError, Result};
pub use evaluator::RetrievalEvaluator;
pub use outcome::{CallOutcome, Degradation};
pub use services::{
    AnswerService, CorrectiveSearchProvider, EvidenceStore, LlmAnswerService, ServiceCheck,
};
pub use session::{CragSession, SessionComponents, SetupSummary};
pub use store::{InMemoryEvidenceStore, LexicalEmbedder, TickerLocks};
pub use types::{
    Answer, AssembledContext, CorrectiveEvidence, Document, DocumentSource, GradeResult, Question,
    RetrievedSet, Tier,
};
pub use workflow::{Orchestrator, OrchestratorSettings, RunReport, WorkflowState};
