//! In-process evidence store
//!
//! Each ticker maps to an immutable, fully-embedded snapshot behind an `Arc`.
//! `upsert` embeds first and only then swaps the snapshot in, so a search
//! sees either the old document set or the new one, never a mix.

use crate::error::{CragError, Result};
use crate::services::EvidenceStore;
use crate::store::similarity::{cosine_similarity, l2_norm};
use crate::types::{Document, RetrievedSet};
use agent_llm::EmbeddingProvider;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

struct IndexedDocument {
    document: Document,
    vector: Vec<f32>,
    norm: f32,
}

/// Cosine-similarity store over an [`EmbeddingProvider`]
pub struct InMemoryEvidenceStore {
    embedder: Arc<dyn EmbeddingProvider>,
    indexes: RwLock<HashMap<String, Arc<Vec<IndexedDocument>>>>,
}

impl InMemoryEvidenceStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents indexed for `ticker`
    pub async fn len(&self, ticker: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(ticker)
            .map_or(0, |index| index.len())
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    #[instrument(skip(self), fields(embedder = self.embedder.name()))]
    async fn search(&self, ticker: &str, query: &str, k: usize) -> Result<RetrievedSet> {
        let Some(index) = self.indexes.read().await.get(ticker).cloned() else {
            debug!("No index for ticker");
            return Ok(RetrievedSet::default());
        };
        if index.is_empty() || k == 0 {
            return Ok(RetrievedSet::default());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CragError::Other("embedder returned no query vector".to_string()))?;
        let query_norm = l2_norm(&query_vector);
        if query_norm == 0.0 {
            debug!("Query has no embeddable content");
            return Ok(RetrievedSet::default());
        }

        let mut hits: Vec<(f32, &IndexedDocument)> = index
            .iter()
            .filter(|entry| entry.norm > 0.0 && entry.vector.len() == query_vector.len())
            .map(|entry| {
                let score = cosine_similarity(&query_vector, &entry.vector, query_norm, entry.norm);
                (score, entry)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.document.id.cmp(&b.1.document.id))
        });
        hits.truncate(k);

        debug!(hits = hits.len(), "Search complete");
        Ok(RetrievedSet::new(
            hits.into_iter()
                .map(|(_, entry)| entry.document.clone())
                .collect(),
        ))
    }

    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    async fn upsert(&self, ticker: &str, documents: Vec<Document>) -> Result<()> {
        if let Some(stray) = documents.iter().find(|d| d.ticker != ticker) {
            return Err(CragError::InvalidDocument(format!(
                "{} belongs to {}, not {ticker}",
                stray.id, stray.ticker
            )));
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(CragError::Other(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let snapshot: Vec<IndexedDocument> = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| IndexedDocument {
                norm: l2_norm(&vector),
                document,
                vector,
            })
            .collect();

        let count = snapshot.len();
        self.indexes
            .write()
            .await
            .insert(ticker.to_string(), Arc::new(snapshot));
        info!(ticker, count, "Index replaced");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, ticker: &str) -> Result<()> {
        if self.indexes.write().await.remove(ticker).is_some() {
            info!(ticker, "Index dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LexicalEmbedder;
    use crate::types::DocumentSource;
    use agent_llm::LLMError;

    fn store() -> InMemoryEvidenceStore {
        InMemoryEvidenceStore::new(Arc::new(LexicalEmbedder::default()))
    }

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, DocumentSource::News, "AAPL", text)
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_empty() {
        let result = store().search("ZZZZ", "anything", 5).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_ranked_by_similarity() {
        let store = store();
        store
            .upsert(
                "AAPL",
                vec![
                    doc("AAPL:news:00", "iphone launch event in cupertino"),
                    doc("AAPL:news:01", "quarterly earnings revenue beat estimates"),
                    doc("AAPL:news:02", "earnings call scheduled"),
                ],
            )
            .await
            .unwrap();

        let result = store.search("AAPL", "earnings revenue", 2).await.unwrap();
        assert_eq!(result.ids(), vec!["AAPL:news:01", "AAPL:news:02"]);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let store = store();
        store
            .upsert(
                "AAPL",
                vec![
                    doc("AAPL:news:02", "dividend announced"),
                    doc("AAPL:news:00", "dividend announced"),
                    doc("AAPL:news:01", "dividend announced"),
                ],
            )
            .await
            .unwrap();

        let result = store.search("AAPL", "dividend", 3).await.unwrap();
        assert_eq!(result.ids(), vec!["AAPL:news:00", "AAPL:news:01", "AAPL:news:02"]);
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let store = store();
        store
            .upsert(
                "AAPL",
                vec![
                    doc("AAPL:market_data", "price volume market cap"),
                    doc("AAPL:news:00", "price target raised"),
                ],
            )
            .await
            .unwrap();

        let first = store.search("AAPL", "price", 5).await.unwrap();
        let second = store.search("AAPL", "price", 5).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_set() {
        let store = store();
        store
            .upsert(
                "AAPL",
                vec![
                    doc("AAPL:news:00", "old story"),
                    doc("AAPL:news:01", "old story two"),
                ],
            )
            .await
            .unwrap();
        store
            .upsert("AAPL", vec![doc("AAPL:news:00", "fresh story")])
            .await
            .unwrap();

        assert_eq!(store.len("AAPL").await, 1);
        let result = store.search("AAPL", "story", 5).await.unwrap();
        assert_eq!(result.documents()[0].text, "fresh story");
    }

    #[tokio::test]
    async fn test_remove_drops_only_that_ticker() {
        let store = store();
        store
            .upsert("AAPL", vec![doc("AAPL:news:00", "iphone sales")])
            .await
            .unwrap();
        let msft = Document::new("MSFT:news:00", DocumentSource::News, "MSFT", "cloud sales");
        store.upsert("MSFT", vec![msft]).await.unwrap();

        store.remove("AAPL").await.unwrap();
        store.remove("AAPL").await.unwrap();

        assert_eq!(store.len("AAPL").await, 0);
        assert!(store.search("AAPL", "sales", 3).await.unwrap().is_empty());
        assert_eq!(store.len("MSFT").await, 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_foreign_ticker() {
        let store = store();
        let foreign = Document::new("MSFT:news:00", DocumentSource::News, "MSFT", "azure");
        let err = store.upsert("AAPL", vec![foreign]).await.unwrap_err();
        assert!(matches!(err, CragError::InvalidDocument(_)));
        assert_eq!(store.len("AAPL").await, 0);
    }

    #[tokio::test]
    async fn test_zero_k_and_unembeddable_query() {
        let store = store();
        store.upsert("AAPL", vec![doc("AAPL:news:00", "buyback")]).await.unwrap();
        assert!(store.search("AAPL", "buyback", 0).await.unwrap().is_empty());
        assert!(store.search("AAPL", "?!", 5).await.unwrap().is_empty());
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _inputs: &[String]) -> agent_llm::Result<Vec<Vec<f32>>> {
            Err(LLMError::RequestFailed("HTTP 500".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_failed_upsert_keeps_previous_snapshot() {
        let good = store();
        good.upsert("AAPL", vec![doc("AAPL:news:00", "kept")]).await.unwrap();

        let broken = InMemoryEvidenceStore {
            embedder: Arc::new(BrokenEmbedder),
            indexes: RwLock::new(std::mem::take(&mut *good.indexes.write().await)),
        };
        let err = broken.upsert("AAPL", vec![doc("AAPL:news:00", "lost")]).await;
        assert!(matches!(err, Err(CragError::LlmError(_))));
        assert_eq!(broken.len("AAPL").await, 1);
    }
}
