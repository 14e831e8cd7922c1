//! Evolution controller: the bounded GENERATE → EVALUATE → decide loop.
//!
//! One iteration asks the oracle for a candidate, evaluates it in the
//! isolated harness, appends every per-trace result to history and picks the
//! next oracle request from the classified outcome:
//!
//! | Outcome              | Next step                                  |
//! |----------------------|--------------------------------------------|
//! | CompileError         | fix-compile request                        |
//! | Timeout              | fix-timeout request (source re-read)       |
//! | Score ≥ threshold    | persist, then improve request              |
//! | Score < threshold    | improve request                            |
//! | RuntimeError         | stop                                       |
//! | Unclassified         | stop                                       |
//!
//! The final scheduled iteration logs its outcome and stops regardless of
//! kind. Collaborator failures end the run with a [`StopReason`]; nothing
//! escapes [`EvolutionController::run`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::classify::{classify, Outcome};
use crate::domain::{
    AcceptedCandidate, Candidate, EvaluationResult, EvolutionConfig, ScoreHistoryEntry,
};
use crate::harness::Harness;
use crate::metrics::Metrics;
use crate::obs::{
    emit_candidate_accepted, emit_candidate_generated, emit_evaluation_classified,
    emit_evolution_finished, emit_evolution_started, emit_iteration_abandoned,
    emit_iteration_started, IterationSpan,
};
use crate::oracle::{Oracle, OracleRequest, PromptBuilder, RequestKind};
use crate::sandbox::{run_with_timeout, WrapperOutcome};
use crate::store::{AcceptedStore, CandidateWorkspace, ScoreHistory, StoreResult};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// All scheduled iterations ran.
    BudgetExhausted,
    /// The candidate ran but produced no usable metric; no repair strategy
    /// exists for this kind.
    RuntimeError { message: String },
    /// Timed out and the prior source could not be re-read.
    TimeoutSourceUnavailable { detail: String },
    /// The wrapper could not classify the evaluation.
    Unclassified { detail: String },
    /// The oracle call failed or returned no code.
    OracleFailed { detail: String },
    /// Workspace, history or accepted store failed.
    StoreFailed { detail: String },
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::BudgetExhausted => "budget_exhausted",
            StopReason::RuntimeError { .. } => "runtime_error",
            StopReason::TimeoutSourceUnavailable { .. } => "timeout_source_unavailable",
            StopReason::Unclassified { .. } => "unclassified",
            StopReason::OracleFailed { .. } => "oracle_failed",
            StopReason::StoreFailed { .. } => "store_failed",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::BudgetExhausted => f.write_str("iteration budget exhausted"),
            StopReason::RuntimeError { message } => write!(f, "runtime error: {message}"),
            StopReason::TimeoutSourceUnavailable { detail } => {
                write!(f, "timed out and prior source unavailable: {detail}")
            }
            StopReason::Unclassified { detail } => write!(f, "unclassified failure: {detail}"),
            StopReason::OracleFailed { detail } => write!(f, "oracle failed: {detail}"),
            StopReason::StoreFailed { detail } => write!(f, "store failed: {detail}"),
        }
    }
}

/// Auditable record of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub candidate: String,
    /// The request that produced this candidate.
    pub request: RequestKind,
    pub outcome: Outcome,
    /// Per-trace results, empty on timeout or unclassified failure.
    pub results: Vec<EvaluationResult>,
    pub accepted: Option<AcceptedCandidate>,
    /// The request issued next, `None` when the loop stopped here.
    pub next_request: Option<RequestKind>,
}

/// Summary returned by [`EvolutionController::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub iterations_run: u32,
    pub records: Vec<IterationRecord>,
    pub stop_reason: StopReason,
    pub best_score: Option<f64>,
    pub accepted: Vec<AcceptedCandidate>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// What to do after a non-final evaluation.
enum Transition {
    Continue {
        next: OracleRequest,
        accepted: Option<AcceptedCandidate>,
    },
    Stop(StopReason),
}

/// Drives the evolution loop over injected collaborators.
pub struct EvolutionController {
    config: EvolutionConfig,
    oracle: Arc<dyn Oracle>,
    harness: Arc<dyn Harness>,
    workspace: CandidateWorkspace,
    history: Arc<dyn ScoreHistory>,
    accepted_store: Arc<dyn AcceptedStore>,
    prompts: PromptBuilder,
    metrics: Arc<Metrics>,
}

impl EvolutionController {
    pub fn new(
        config: EvolutionConfig,
        oracle: Arc<dyn Oracle>,
        harness: Arc<dyn Harness>,
        workspace: CandidateWorkspace,
        history: Arc<dyn ScoreHistory>,
        accepted_store: Arc<dyn AcceptedStore>,
    ) -> Self {
        Self {
            config,
            oracle,
            harness,
            workspace,
            history,
            accepted_store,
            prompts: PromptBuilder::without_references(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Replace the prompt builder (e.g. one that embeds reference policies).
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Count into `metrics` instead of a controller-private set.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Run up to `config.iterations` iterations, strictly one at a time.
    pub async fn run(&self) -> EvolutionReport {
        let started_at = Utc::now();
        emit_evolution_started(
            self.config.iterations,
            self.config.timeout_secs,
            self.config.acceptance_threshold,
        );

        let mut request = OracleRequest::Initial;
        let mut records: Vec<IterationRecord> = Vec::new();
        let mut accepted: Vec<AcceptedCandidate> = Vec::new();
        let mut stop_reason = StopReason::BudgetExhausted;

        for iteration in 1..=self.config.iterations {
            let _span = IterationSpan::enter(iteration);
            let is_final = iteration == self.config.iterations;
            emit_iteration_started(iteration, request.kind().as_str());

            // GENERATE
            let candidate = match self.generate(iteration, &request).await {
                Ok(candidate) => candidate,
                Err(reason) => {
                    emit_iteration_abandoned(iteration, &reason);
                    stop_reason = reason;
                    break;
                }
            };

            // EVALUATE
            let wrapped = self.evaluate(&candidate).await;
            let outcome = classify(&wrapped);
            if let Err(err) = self.append_history(&wrapped, &outcome) {
                let reason = StopReason::StoreFailed {
                    detail: format!("score history: {err}"),
                };
                emit_iteration_abandoned(iteration, &reason);
                stop_reason = reason;
                break;
            }
            emit_evaluation_classified(
                iteration,
                &candidate.file_name,
                outcome.label(),
                score_of(&outcome),
                is_final,
            );

            let mut record = IterationRecord {
                iteration,
                candidate: candidate.file_name.clone(),
                request: request.kind(),
                outcome: outcome.clone(),
                results: wrapped.results().to_vec(),
                accepted: None,
                next_request: None,
            };

            if is_final {
                info!(
                    candidate = %candidate.file_name,
                    outcome = %outcome.label(),
                    score = ?score_of(&outcome),
                    "final iteration evaluated"
                );
                records.push(record);
                break;
            }

            match self.transition(&outcome, &candidate) {
                Transition::Continue {
                    next,
                    accepted: newly_accepted,
                } => {
                    record.next_request = Some(next.kind());
                    if let Some(entry) = newly_accepted {
                        accepted.push(entry.clone());
                        record.accepted = Some(entry);
                    }
                    records.push(record);
                    request = next;
                }
                Transition::Stop(reason) => {
                    emit_iteration_abandoned(iteration, &reason);
                    records.push(record);
                    stop_reason = reason;
                    break;
                }
            }
        }

        let best_score = records
            .iter()
            .flat_map(|r| r.results.iter())
            .filter_map(|r| r.outcome.score())
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));
        let iterations_run = u32::try_from(records.len()).unwrap_or(u32::MAX);

        emit_evolution_finished(iterations_run, stop_reason.as_str(), best_score);
        self.metrics.flush();

        EvolutionReport {
            iterations_run,
            records,
            stop_reason,
            best_score,
            accepted,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// GENERATE: render the request, call the oracle, freeze the candidate.
    async fn generate(
        &self,
        iteration: u32,
        request: &OracleRequest,
    ) -> Result<Candidate, StopReason> {
        let prompt = self.prompts.build(request);
        let source = self.oracle.generate(&prompt).await.map_err(|err| {
            error!(request = %request.kind(), error = %err, "oracle request failed");
            StopReason::OracleFailed {
                detail: err.to_string(),
            }
        })?;

        let candidate = self.workspace.write(iteration, &source).map_err(|err| {
            error!(error = %err, "could not write candidate");
            StopReason::StoreFailed {
                detail: format!("candidate workspace: {err}"),
            }
        })?;

        self.metrics.inc_candidates();
        emit_candidate_generated(
            iteration,
            &candidate.file_name,
            request.kind().as_str(),
            source.len(),
        );
        Ok(candidate)
    }

    /// EVALUATE: run the harness off this thread under the iteration deadline.
    async fn evaluate(&self, candidate: &Candidate) -> WrapperOutcome {
        let harness = Arc::clone(&self.harness);
        let owned = candidate.clone();
        let outcome = run_with_timeout(self.config.timeout(), async move {
            harness.evaluate(&owned).await
        })
        .await;
        self.metrics.inc_evaluations();
        outcome
    }

    /// One entry per per-trace result, or one synthetic entry for a timeout.
    fn append_history(&self, wrapped: &WrapperOutcome, outcome: &Outcome) -> StoreResult<()> {
        match outcome {
            Outcome::Timeout => {
                self.metrics.inc_timeouts();
                self.history.append(&ScoreHistoryEntry::timeout())
            }
            Outcome::CompileError { .. }
            | Outcome::RuntimeError { .. }
            | Outcome::Score { .. }
            | Outcome::Unclassified { .. } => {
                if matches!(outcome, Outcome::CompileError { .. }) {
                    self.metrics.inc_compile_errors();
                }
                for result in wrapped.results() {
                    self.history.append(&ScoreHistoryEntry::from(result))?;
                }
                Ok(())
            }
        }
    }

    fn transition(&self, outcome: &Outcome, candidate: &Candidate) -> Transition {
        match outcome {
            Outcome::CompileError { diagnostic, .. } => Transition::Continue {
                next: OracleRequest::FixCompile {
                    source: candidate.source.clone(),
                    diagnostic: diagnostic.clone(),
                },
                accepted: None,
            },
            Outcome::Timeout => match self.workspace.load(candidate) {
                Ok(source) => {
                    warn!(candidate = %candidate.file_name, "simulation timed out");
                    Transition::Continue {
                        next: OracleRequest::FixTimeout { source },
                        accepted: None,
                    }
                }
                Err(err) => Transition::Stop(StopReason::TimeoutSourceUnavailable {
                    detail: err.to_string(),
                }),
            },
            Outcome::Score { value, .. } => {
                let score = *value;
                let accepted = if score >= self.config.acceptance_threshold {
                    match self.accepted_store.accept(candidate, score) {
                        Ok(entry) => {
                            self.metrics.inc_accepted();
                            emit_candidate_accepted(
                                &candidate.file_name,
                                score,
                                &entry.stored_at.display().to_string(),
                            );
                            Some(entry)
                        }
                        Err(err) => {
                            return Transition::Stop(StopReason::StoreFailed {
                                detail: format!("accepted store: {err}"),
                            })
                        }
                    }
                } else {
                    None
                };
                Transition::Continue {
                    next: OracleRequest::Improve {
                        source: candidate.source.clone(),
                        score,
                    },
                    accepted,
                }
            }
            // TODO: decide whether "ran but produced no metric" deserves its
            // own repair prompt; until then the iteration ends here.
            Outcome::RuntimeError { message, .. } => Transition::Stop(StopReason::RuntimeError {
                message: message.clone(),
            }),
            Outcome::Unclassified { reason } => Transition::Stop(StopReason::Unclassified {
                detail: reason.clone(),
            }),
        }
    }
}

fn score_of(outcome: &Outcome) -> Option<f64> {
    match outcome {
        Outcome::Score { value, .. } => Some(*value),
        _ => None,
    }
}
