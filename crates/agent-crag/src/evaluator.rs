//! Retrieval grading
//!
//! Assigns one [`Tier`] to a retrieved set. Failure here never ends a run and
//! never yields [`Tier::Correct`]: a failed judgment call grades `incorrect`,
//! an unreadable label grades `ambiguous`. Either way the run goes looking for
//! more evidence.

use crate::outcome::{CallOutcome, Degradation, with_timeout};
use crate::prompts::{self, GradingExcerpt};
use crate::services::AnswerService;
use crate::text::excerpt;
use crate::types::{GradeResult, Question, RetrievedSet, Tier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_DOCUMENTS: usize = 3;
const DEFAULT_MAX_CHARS: usize = 500;

/// Grades retrieved evidence through a dedicated judgment service
pub struct RetrievalEvaluator {
    judge: Arc<dyn AnswerService>,
    timeout: Duration,
    max_documents: usize,
    max_chars: usize,
}

impl RetrievalEvaluator {
    /// `judge` must not be the service used for answer generation
    pub fn new(judge: Arc<dyn AnswerService>) -> Self {
        Self {
            judge,
            timeout: DEFAULT_TIMEOUT,
            max_documents: DEFAULT_MAX_DOCUMENTS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    /// Time budget for the judgment call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How much of the retrieved set the judge gets to read
    pub fn with_excerpt_limits(mut self, max_documents: usize, max_chars: usize) -> Self {
        self.max_documents = max_documents;
        self.max_chars = max_chars;
        self
    }

    /// Grade `retrieved` against `question`
    ///
    /// An empty set grades `incorrect` without calling the judge.
    #[instrument(skip_all, fields(ticker = %question.ticker, documents = retrieved.len()))]
    pub async fn grade(
        &self,
        question: &Question,
        retrieved: &RetrievedSet,
    ) -> CallOutcome<GradeResult> {
        if retrieved.is_empty() {
            debug!("Nothing retrieved, grading incorrect");
            return CallOutcome::Ok(GradeResult::new(
                Tier::Incorrect,
                Some("no documents retrieved".to_string()),
            ));
        }

        let excerpts: Vec<GradingExcerpt<'_>> = retrieved
            .documents()
            .iter()
            .take(self.max_documents)
            .map(|doc| GradingExcerpt {
                label: doc.source.label(),
                text: excerpt(&doc.text, self.max_chars),
            })
            .collect();

        let judged = match prompts::render_grading_prompt(&question.text, &excerpts) {
            Ok(prompt) => {
                with_timeout(self.timeout, "retrieval grading", self.judge.generate(&prompt)).await
            }
            Err(e) => Err(e),
        };

        let raw = match judged {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Judgment call failed, grading incorrect");
                return CallOutcome::Degraded {
                    value: GradeResult::new(Tier::Incorrect, None),
                    reason: Degradation::GradingDegraded(e.to_string()),
                };
            }
        };

        match parse_tier(&raw) {
            Some(tier) => {
                debug!(%tier, "Retrieval graded");
                CallOutcome::Ok(GradeResult::new(tier, rationale(&raw, tier)))
            }
            None => {
                warn!(response = %raw, "Unreadable judgment label, grading ambiguous");
                CallOutcome::Degraded {
                    value: GradeResult::new(Tier::Ambiguous, None),
                    reason: Degradation::GradingDegraded(format!("unreadable label {raw:?}")),
                }
            }
        }
    }
}

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "isn", "aren", "wasn", "don", "doesn", "t",
];

/// Map a judgment response to exactly one tier
///
/// Labels are matched as whole words, case-insensitively. The response is
/// rejected when it names more than one distinct label or carries a negation
/// anywhere. `correct` is only accepted as a bare label: an explanation or
/// hedge next to it counts as unreadable.
pub fn parse_tier(raw: &str) -> Option<Tier> {
    let words: Vec<String> = raw
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    if words.iter().any(|w| NEGATIONS.contains(&w.as_str())) {
        return None;
    }

    let mut found: Option<Tier> = None;
    for word in &words {
        let tier = match word.as_str() {
            "correct" => Tier::Correct,
            "ambiguous" => Tier::Ambiguous,
            "incorrect" => Tier::Incorrect,
            _ => continue,
        };
        match found {
            Some(seen) if seen != tier => return None,
            _ => found = Some(tier),
        }
    }

    match found {
        Some(Tier::Correct) if words.iter().any(|w| w != "correct") => None,
        other => other,
    }
}

/// Anything the judge said beyond the bare label
fn rationale(raw: &str, tier: Tier) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .eq_ignore_ascii_case(tier.as_str());
    (!bare).then(|| trimmed.to_string())
}
