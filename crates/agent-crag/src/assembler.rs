//! Final context assembly

use crate::text::excerpt;
use crate::types::{AssembledContext, CorrectiveEvidence, Document, GradeResult, RetrievedSet};

const DEFAULT_CORRECTIVE_LOCAL_DOCUMENTS: usize = 2;
const DEFAULT_CORRECTIVE_LOCAL_CHARS: usize = 800;

pub const LOCAL_HEADING: &str = "Local evidence:";
pub const CORRECTIVE_HEADING: &str = "Web evidence:";
pub const NO_EVIDENCE_NOTE: &str =
    "No evidence is available for this question. Say so instead of guessing.";

/// Builds the text handed to answer generation
///
/// With a `correct` grade the context holds every retrieved document in full
/// and nothing else. Otherwise it holds a trimmed local section followed by
/// the web snippets. Empty sections are left out.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    corrective_local_documents: usize,
    corrective_local_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            corrective_local_documents: DEFAULT_CORRECTIVE_LOCAL_DOCUMENTS,
            corrective_local_chars: DEFAULT_CORRECTIVE_LOCAL_CHARS,
        }
    }
}

impl ContextAssembler {
    /// Limits applied to local documents on the corrective path
    pub fn new(corrective_local_documents: usize, corrective_local_chars: usize) -> Self {
        Self {
            corrective_local_documents,
            corrective_local_chars,
        }
    }

    pub fn build(
        &self,
        retrieved: &RetrievedSet,
        grade: &GradeResult,
        corrective: Option<&CorrectiveEvidence>,
    ) -> AssembledContext {
        let mut sections = Vec::with_capacity(2);

        if grade.tier.needs_correction() {
            let local: Vec<String> = retrieved
                .documents()
                .iter()
                .take(self.corrective_local_documents)
                .map(|doc| labeled(doc, excerpt(&doc.text, self.corrective_local_chars)))
                .collect();
            if !local.is_empty() {
                sections.push(section(LOCAL_HEADING, &local));
            }

            if let Some(evidence) = corrective.filter(|e| !e.is_empty()) {
                let snippets: Vec<String> = evidence
                    .snippets()
                    .iter()
                    .map(|s| format!("- {s}"))
                    .collect();
                sections.push(section(CORRECTIVE_HEADING, &snippets));
            }
        } else {
            let local: Vec<String> = retrieved
                .documents()
                .iter()
                .map(|doc| labeled(doc, &doc.text))
                .collect();
            if !local.is_empty() {
                sections.push(section(LOCAL_HEADING, &local));
            }
        }

        if sections.is_empty() {
            return AssembledContext::new(NO_EVIDENCE_NOTE.to_string());
        }
        AssembledContext::new(sections.join("\n\n"))
    }
}

fn labeled(doc: &Document, text: &str) -> String {
    format!("[{}] {}", doc.source.label(), text)
}

fn section(heading: &str, entries: &[String]) -> String {
    format!("{heading}\n{}", entries.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentSource, Tier};

    fn docs() -> RetrievedSet {
        RetrievedSet::new(vec![
            Document::new(
                "AAPL:market_data",
                DocumentSource::MarketData,
                "AAPL",
                "Price: $190.00\nP/E: 29.1",
            ),
            Document::new("AAPL:news:00", DocumentSource::News, "AAPL", "n".repeat(1000)),
            Document::new("AAPL:news:01", DocumentSource::News, "AAPL", "third"),
        ])
    }

    fn grade(tier: Tier) -> GradeResult {
        GradeResult::new(tier, None)
    }

    fn web() -> CorrectiveEvidence {
        CorrectiveEvidence::new(vec![
            "AAPL closed up 2% on Friday".to_string(),
            "Analysts raised targets".to_string(),
        ])
    }

    #[test]
    fn test_correct_tier_uses_full_local_evidence_only() {
        let context =
            ContextAssembler::default().build(&docs(), &grade(Tier::Correct), Some(&web()));
        let text = context.as_str();

        assert!(text.starts_with("Local evidence:\n[Market data] Price: $190.00\nP/E: 29.1"));
        assert!(text.contains(&"n".repeat(1000)));
        assert!(text.contains("[News] third"));
        assert!(!text.contains(CORRECTIVE_HEADING));
        assert!(!text.contains("Analysts raised targets"));
    }

    #[test]
    fn test_corrective_tier_orders_local_before_web() {
        let context =
            ContextAssembler::default().build(&docs(), &grade(Tier::Ambiguous), Some(&web()));
        let text = context.as_str();

        let local_at = text.find(LOCAL_HEADING).unwrap();
        let web_at = text.find(CORRECTIVE_HEADING).unwrap();
        assert!(local_at < web_at);
        assert!(text.contains("- AAPL closed up 2% on Friday\n\n- Analysts raised targets"));
    }

    #[test]
    fn test_corrective_tier_trims_local_documents() {
        let context =
            ContextAssembler::default().build(&docs(), &grade(Tier::Incorrect), Some(&web()));
        let text = context.as_str();

        assert!(text.contains(&"n".repeat(800)));
        assert!(!text.contains(&"n".repeat(801)));
        assert!(!text.contains("third"));
    }

    #[test]
    fn test_empty_web_evidence_falls_back_to_local() {
        let empty = CorrectiveEvidence::default();
        let context =
            ContextAssembler::default().build(&docs(), &grade(Tier::Ambiguous), Some(&empty));
        let text = context.as_str();

        assert!(text.starts_with(LOCAL_HEADING));
        assert!(!text.contains(CORRECTIVE_HEADING));
    }

    #[test]
    fn test_empty_local_omits_local_section() {
        let context = ContextAssembler::default().build(
            &RetrievedSet::default(),
            &grade(Tier::Incorrect),
            Some(&web()),
        );
        assert_eq!(
            context.as_str(),
            "Web evidence:\n- AAPL closed up 2% on Friday\n\n- Analysts raised targets"
        );
    }

    #[test]
    fn test_no_evidence_at_all() {
        let context = ContextAssembler::default().build(
            &RetrievedSet::default(),
            &grade(Tier::Incorrect),
            Some(&CorrectiveEvidence::default()),
        );
        assert_eq!(context.as_str(), NO_EVIDENCE_NOTE);
    }

    #[test]
    fn test_custom_limits() {
        let context = ContextAssembler::new(1, 5).build(&docs(), &grade(Tier::Ambiguous), None);
        assert_eq!(context.as_str(), "Local evidence:\n[Market data] Price");
    }
}
