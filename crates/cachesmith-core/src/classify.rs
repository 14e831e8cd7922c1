//! Outcome classification for the controller's next decision.
//!
//! Only the first trace in order drives the decision; every per-trace result
//! is still written to history by the controller.

use serde::{Deserialize, Serialize};

use crate::domain::{OutcomeKind, TraceOutcome};
use crate::sandbox::WrapperOutcome;

/// The representative outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    CompileError { trace_id: String, diagnostic: String },
    RuntimeError { trace_id: String, message: String },
    Timeout,
    Score { trace_id: String, value: f64 },
    /// Not attributable to the candidate: machinery failure or no results.
    Unclassified { reason: String },
}

impl Outcome {
    /// History kind, `None` for unclassified outcomes.
    pub fn kind(&self) -> Option<OutcomeKind> {
        match self {
            Outcome::CompileError { .. } => Some(OutcomeKind::CompileError),
            Outcome::RuntimeError { .. } => Some(OutcomeKind::RuntimeError),
            Outcome::Timeout => Some(OutcomeKind::Timeout),
            Outcome::Score { .. } => Some(OutcomeKind::Score),
            Outcome::Unclassified { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind().map(|k| k.as_str()).unwrap_or("Unclassified")
    }
}

/// Map a wrapper result to the outcome that drives the next oracle request.
pub fn classify(outcome: &WrapperOutcome) -> Outcome {
    match outcome {
        WrapperOutcome::TimedOut { .. } => Outcome::Timeout,
        WrapperOutcome::Failed { reason } => Outcome::Unclassified {
            reason: reason.clone(),
        },
        WrapperOutcome::Completed { results } => match results.first() {
            None => Outcome::Unclassified {
                reason: "harness returned no results".to_string(),
            },
            Some(first) => {
                let trace_id = first.trace_id.clone();
                match &first.outcome {
                    TraceOutcome::CompileError { message } => Outcome::CompileError {
                        trace_id,
                        diagnostic: message.clone(),
                    },
                    TraceOutcome::RuntimeError { message } => Outcome::RuntimeError {
                        trace_id,
                        message: message.clone(),
                    },
                    TraceOutcome::Score { value } => Outcome::Score {
                        trace_id,
                        value: *value,
                    },
                }
            }
        },
    }
}
