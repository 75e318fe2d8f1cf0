//! Data model shared by the workflow stages

use crate::error::{CragError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const MAX_TICKER_LEN: usize = 10;

/// Trim and uppercase a ticker, rejecting anything that is not `[A-Z0-9.-]{1,10}`
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if valid {
        Ok(ticker)
    } else {
        Err(CragError::InvalidTicker(raw.to_string()))
    }
}

/// Where a document's content was acquired from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// Structured market facts (price, valuation, volume)
    MarketData,
    /// Recent headlines
    News,
}

impl DocumentSource {
    /// Machine name, used in document ids
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::News => "news",
        }
    }

    /// Human label, used in assembled context
    pub fn label(self) -> &'static str {
        match self {
            Self::MarketData => "Market data",
            Self::News => "News",
        }
    }
}

/// A unit of indexed evidence
///
/// Documents are immutable once stored. Re-running setup for a ticker replaces
/// its whole document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source: DocumentSource,
    pub text: String,
    pub ticker: String,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        source: DocumentSource,
        ticker: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            text: text.into(),
            ticker: ticker.into(),
        }
    }
}

/// A user question scoped to one ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub ticker: String,
}

impl Question {
    pub fn new(ticker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ticker: ticker.into(),
        }
    }
}

/// Relevance-ranked search results, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedSet {
    documents: Vec<Document>,
}

impl RetrievedSet {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Quality tier assigned to a retrieved set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Local evidence is sufficient on its own
    Correct,
    /// Local evidence is partial or unclear
    Ambiguous,
    /// Local evidence is missing or irrelevant
    Incorrect,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Ambiguous => "ambiguous",
            Self::Incorrect => "incorrect",
        }
    }

    /// Whether this tier sends the run down the corrective path
    pub fn needs_correction(self) -> bool {
        !matches!(self, Self::Correct)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of grading one retrieved set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub tier: Tier,
    pub rationale: Option<String>,
}

impl GradeResult {
    pub fn new(tier: Tier, rationale: Option<String>) -> Self {
        Self { tier, rationale }
    }
}

/// Web snippets gathered on the corrective path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectiveEvidence {
    snippets: Vec<String>,
}

impl CorrectiveEvidence {
    /// Keep non-blank snippets in their original order
    pub fn new(snippets: Vec<String>) -> Self {
        let snippets = snippets
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { snippets }
    }

    pub fn snippets(&self) -> &[String] {
        &self.snippets
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

/// Final prompt context handed to generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    text: String,
}

impl AssembledContext {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// A generated answer and the evidence tier it was built on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub tier_used: Tier,
    /// Web snippets made it into the context
    pub used_corrective: bool,
    pub run_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_ticker("rds-a").unwrap(), "RDS-A");
    }

    #[test]
    fn test_normalize_ticker_rejects_garbage() {
        for raw in ["", "   ", "AA PL", "TOOLONGTICKER", "$AAPL"] {
            assert!(
                matches!(normalize_ticker(raw), Err(CragError::InvalidTicker(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_tier_routing() {
        assert!(!Tier::Correct.needs_correction());
        assert!(Tier::Ambiguous.needs_correction());
        assert!(Tier::Incorrect.needs_correction());
        assert_eq!(Tier::Ambiguous.to_string(), "ambiguous");
    }

    #[test]
    fn test_corrective_evidence_drops_blank_snippets() {
        let evidence = CorrectiveEvidence::new(vec![
            " Shares rose 3% ".to_string(),
            "\n".to_string(),
            "Guidance raised".to_string(),
        ]);
        assert_eq!(evidence.snippets(), ["Shares rose 3%", "Guidance raised"]);
        assert!(CorrectiveEvidence::new(vec![String::new()]).is_empty());
    }

    #[test]
    fn test_document_source_names() {
        assert_eq!(DocumentSource::MarketData.as_str(), "market_data");
        assert_eq!(DocumentSource::News.label(), "News");
    }
}
