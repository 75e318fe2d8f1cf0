//! Capabilities the workflow depends on
//!
//! The orchestrator only ever sees these traits. Concrete adapters live in
//! [`crate::store`], [`crate::api`] and [`answer`].

pub mod answer;

use crate::error::Result;
use crate::types::{Document, RetrievedSet};
use async_trait::async_trait;

pub use answer::LlmAnswerService;

/// Similarity search over indexed documents, partitioned by ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Top `k` documents for `query`, ordered by score descending then id ascending
    ///
    /// Repeating a query against an unchanged index yields the same ids in
    /// the same order. An unknown ticker yields an empty set.
    async fn search(&self, ticker: &str, query: &str, k: usize) -> Result<RetrievedSet>;

    /// Replace the ticker's whole document set in one step
    async fn upsert(&self, ticker: &str, documents: Vec<Document>) -> Result<()>;

    /// Drop the ticker's documents; later searches for it come back empty
    async fn remove(&self, ticker: &str) -> Result<()>;
}

/// Web search used on the corrective path
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CorrectiveSearchProvider: Send + Sync {
    /// Short snippets relevant to `query` about `ticker`
    ///
    /// "No results" is an empty vector; errors mean transport failure.
    async fn search(&self, ticker: &str, query: &str) -> Result<Vec<String>>;
}

/// A remote dependency whose credential can be verified up front
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceCheck: Send + Sync {
    /// Setting that holds the credential, e.g. `OPENAI_API_KEY`
    fn credential(&self) -> &'static str;

    /// One cheap authenticated call against the service
    async fn verify(&self) -> Result<()>;
}

/// Single request/response text generation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
