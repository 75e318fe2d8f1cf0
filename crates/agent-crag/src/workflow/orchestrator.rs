//! One question, start to finish
//!
//! A run walks the transition table in [`super::state`]: retrieve, grade,
//! branch, assemble, generate. Only the evidence search and answer generation
//! can fail a run. Grading and corrective search degrade to fallbacks that push
//! the run toward gathering more evidence.

use super::state::{Signal, WorkflowState, transition};
use crate::assembler::ContextAssembler;
use crate::config::CragConfig;
use crate::error::{CragError, Result};
use crate::evaluator::RetrievalEvaluator;
use crate::outcome::{CallOutcome, Degradation, with_timeout};
use crate::prompts;
use crate::services::{AnswerService, CorrectiveSearchProvider, EvidenceStore};
use crate::store::TickerLocks;
use crate::types::{
    Answer, AssembledContext, CorrectiveEvidence, GradeResult, Question, RetrievedSet,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Limits applied to the calls a run makes
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub top_k: usize,
    pub store_timeout: Duration,
    pub corrective_timeout: Duration,
    pub generation_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&CragConfig::default())
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &CragConfig) -> Self {
        Self {
            top_k: config.top_k,
            store_timeout: config.store_timeout,
            corrective_timeout: config.corrective_timeout,
            generation_timeout: config.generation_timeout,
        }
    }
}

/// Everything observed during one run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub question: Question,
    /// States visited in order, starting with `Retrieving`
    pub path: Vec<WorkflowState>,
    pub retrieved: Option<RetrievedSet>,
    pub grade: Option<GradeResult>,
    /// `None` when the corrective branch was not taken
    pub corrective: Option<CorrectiveEvidence>,
    pub context: Option<AssembledContext>,
    pub degradations: Vec<Degradation>,
    pub outcome: Result<Answer>,
}

impl RunReport {
    /// Terminal state of the run
    pub fn final_state(&self) -> WorkflowState {
        self.path.last().copied().unwrap_or(WorkflowState::Failed)
    }
}

/// Bookkeeping for a run in progress
struct Trace {
    state: WorkflowState,
    path: Vec<WorkflowState>,
    retrieved: Option<RetrievedSet>,
    grade: Option<GradeResult>,
    corrective: Option<CorrectiveEvidence>,
    context: Option<AssembledContext>,
    degradations: Vec<Degradation>,
}

impl Trace {
    fn new() -> Self {
        Self {
            state: WorkflowState::Retrieving,
            path: vec![WorkflowState::Retrieving],
            retrieved: None,
            grade: None,
            corrective: None,
            context: None,
            degradations: Vec::new(),
        }
    }

    fn advance(&mut self, signal: Signal) -> Result<()> {
        let next = transition(self.state, signal)?;
        debug!(from = ?self.state, to = ?next, ?signal, "Transition");
        self.state = next;
        self.path.push(next);
        Ok(())
    }

    fn degrade(&mut self, reason: Option<Degradation>) {
        if let Some(reason) = reason {
            warn!(%reason, "Run degraded");
            self.degradations.push(reason);
        }
    }

    fn fail(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if self.advance(Signal::Fatal).is_err() {
            self.state = WorkflowState::Failed;
            self.path.push(WorkflowState::Failed);
        }
    }

    fn into_report(self, run_id: Uuid, question: &Question, outcome: Result<Answer>) -> RunReport {
        RunReport {
            run_id,
            question: question.clone(),
            path: self.path,
            retrieved: self.retrieved,
            grade: self.grade,
            corrective: self.corrective,
            context: self.context,
            degradations: self.degradations,
            outcome,
        }
    }
}

/// Drives questions through the corrective workflow
pub struct Orchestrator {
    store: Arc<dyn EvidenceStore>,
    evaluator: RetrievalEvaluator,
    corrective: Arc<dyn CorrectiveSearchProvider>,
    generator: Arc<dyn AnswerService>,
    assembler: ContextAssembler,
    locks: TickerLocks,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// `locks` must be shared with whatever re-indexes the store
    pub fn new(
        store: Arc<dyn EvidenceStore>,
        evaluator: RetrievalEvaluator,
        corrective: Arc<dyn CorrectiveSearchProvider>,
        generator: Arc<dyn AnswerService>,
        assembler: ContextAssembler,
        locks: TickerLocks,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            evaluator,
            corrective,
            generator,
            assembler,
            locks,
            settings,
        }
    }

    /// Answer `question`, or the fatal error that stopped the run
    pub async fn answer(&self, question: &Question) -> Result<Answer> {
        self.run(question).await.outcome
    }

    /// Run `question` and report every step taken
    ///
    /// Holds a shared lease on the question's ticker for the whole run, so a
    /// concurrent setup of the same ticker waits until the answer is built.
    pub async fn run(&self, question: &Question) -> RunReport {
        self.execute(Uuid::new_v4(), question).await
    }

    #[instrument(skip_all, fields(run_id = %run_id, ticker = %question.ticker))]
    async fn execute(&self, run_id: Uuid, question: &Question) -> RunReport {
        let _lease = self.locks.read(&question.ticker).await;
        info!("Run started");

        let mut trace = Trace::new();
        let outcome = self.drive(run_id, question, &mut trace).await;
        match &outcome {
            Ok(answer) => info!(
                tier = %answer.tier_used,
                used_corrective = answer.used_corrective,
                degradations = trace.degradations.len(),
                "Run complete"
            ),
            Err(e) => {
                trace.fail();
                warn!(error = %e, state = ?trace.path.iter().rev().nth(1), "Run failed");
            }
        }
        trace.into_report(run_id, question, outcome)
    }

    async fn drive(&self, run_id: Uuid, question: &Question, trace: &mut Trace) -> Result<Answer> {
        let ticker = question.ticker.as_str();

        // Retrieving
        let retrieved = with_timeout(
            self.settings.store_timeout,
            "evidence search",
            self.store.search(ticker, &question.text, self.settings.top_k),
        )
        .await
        .map_err(|e| CragError::EvidenceUnavailable(e.to_string()))?;
        debug!(documents = retrieved.len(), "Evidence retrieved");
        trace.retrieved = Some(retrieved.clone());
        trace.advance(Signal::Ok)?;

        // Grading
        let (grade, degradation) = self.evaluator.grade(question, &retrieved).await.into_parts()?;
        trace.degrade(degradation);
        trace.grade = Some(grade.clone());
        trace.advance(Signal::from_tier(grade.tier))?;

        // Branching
        let corrective = if grade.tier.needs_correction() {
            let searched = with_timeout(
                self.settings.corrective_timeout,
                "corrective search",
                self.corrective.search(ticker, &question.text),
            )
            .await
            .map(CorrectiveEvidence::new);
            let outcome = CallOutcome::degrade_on_error(searched, CorrectiveEvidence::default, |e| {
                Degradation::CorrectiveSearchDegraded(e.to_string())
            });
            let signal = outcome.signal();
            let (evidence, degradation) = outcome.into_parts()?;
            trace.degrade(degradation);
            trace.corrective = Some(evidence.clone());
            trace.advance(signal)?;
            Some(evidence)
        } else {
            trace.advance(Signal::Ok)?;
            None
        };

        // Assembling
        let context = self.assembler.build(&retrieved, &grade, corrective.as_ref());
        trace.context = Some(context.clone());
        trace.advance(Signal::Ok)?;

        // Generating
        let prompt = prompts::render_answer_prompt(&question.text, context.as_str())
            .map_err(|e| CragError::GenerationFailed(e.to_string()))?;
        let text = with_timeout(
            self.settings.generation_timeout,
            "answer generation",
            self.generator.generate(&prompt),
        )
        .await
        .map_err(|e| CragError::GenerationFailed(e.to_string()))?;
        trace.advance(Signal::Ok)?;

        Ok(Answer {
            text,
            tier_used: grade.tier,
            used_corrective: corrective.is_some_and(|e| !e.is_empty()),
            run_id,
        })
    }
}
