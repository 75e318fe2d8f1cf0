//! Prompt templates
//!
//! Rendered with minijinja. Sections and documents are separated by exactly
//! one blank line.

use crate::error::Result;
use minijinja::{Environment, context};

/// System prompt for answer generation
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a financial analyst. Answer based on the context.";

/// System prompt for the retrieval judgment call
pub const GRADER_SYSTEM_PROMPT: &str = "You are a document quality assessor for financial Q&A. \
Evaluate if retrieved documents contain sufficient information to answer the question.

Return ONLY one word:
- correct: documents contain clear, relevant information to answer the question
- ambiguous: documents have partial information but may need more context
- incorrect: documents lack relevant information or are off-topic";

const GRADING_TEMPLATE: &str = "Question: {{ question }}

Documents:
{% for doc in documents %}{% if not loop.first %}

{% endif %}[{{ doc.label }}] {{ doc.text }}{% endfor %}

Assessment:";

const ANSWER_TEMPLATE: &str = "Question: {{ question }}

Context: {{ context }}";

/// One document as shown to the grader
#[derive(Debug, serde::Serialize)]
pub struct GradingExcerpt<'a> {
    pub label: &'static str,
    pub text: &'a str,
}

/// Judgment prompt listing the question and document excerpts
pub fn render_grading_prompt(question: &str, documents: &[GradingExcerpt<'_>]) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(GRADING_TEMPLATE, context! { question, documents })?)
}

/// Generation prompt pairing the question with the assembled context
pub fn render_answer_prompt(question: &str, context_text: &str) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(ANSWER_TEMPLATE, context! { question, context => context_text })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grading_prompt_lists_documents() {
        let docs = [
            GradingExcerpt {
                label: "Market data",
                text: "Price: $190.12",
            },
            GradingExcerpt {
                label: "News",
                text: "[2026-10-01] Apple unveils new chip",
            },
        ];
        let prompt = render_grading_prompt("Is AAPL up this month?", &docs).unwrap();

        assert_eq!(
            prompt,
            "Question: Is AAPL up this month?\n\nDocuments:\n\
             [Market data] Price: $190.12\n\n\
             [News] [2026-10-01] Apple unveils new chip\n\nAssessment:"
        );
    }

    #[test]
    fn test_answer_prompt_layout() {
        let prompt = render_answer_prompt("What is the P/E?", "Local evidence:\nP/E: 30").unwrap();
        assert_eq!(
            prompt,
            "Question: What is the P/E?\n\nContext: Local evidence:\nP/E: 30"
        );
    }

    #[test]
    fn test_question_text_is_not_reinterpreted() {
        let prompt = render_answer_prompt("{{ 1 + 1 }}?", "ctx").unwrap();
        assert!(prompt.contains("{{ 1 + 1 }}?"));
    }
}
