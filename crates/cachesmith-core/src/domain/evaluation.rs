//! Per-trace evaluation records and the append-only history entries built
//! from them.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Diagnostic recorded when simulator output lacks the LLC marker line.
pub const MARKER_NOT_FOUND: &str = "marker not found";

/// Trace id written for the synthetic entry of a timed-out evaluation.
pub const TIMEOUT_TRACE_ID: &str = "*";

/// The closed set of outcome kinds recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    CompileError,
    RuntimeError,
    Timeout,
    Score,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::CompileError => "CompileError",
            OutcomeKind::RuntimeError => "RuntimeError",
            OutcomeKind::Timeout => "Timeout",
            OutcomeKind::Score => "Score",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, OutcomeKind::Score)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one trace. Kind and payload travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The toolchain rejected the candidate; `message` is its stderr.
    CompileError { message: String },
    /// The binary ran but produced no usable metric.
    RuntimeError { message: String },
    /// LLC hit rate in `[0, 1]`.
    Score { value: f64 },
}

impl TraceOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            TraceOutcome::CompileError { .. } => OutcomeKind::CompileError,
            TraceOutcome::RuntimeError { .. } => OutcomeKind::RuntimeError,
            TraceOutcome::Score { .. } => OutcomeKind::Score,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            TraceOutcome::Score { value } => Some(*value),
            _ => None,
        }
    }
}

/// One record per (candidate, trace) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub trace_id: String,
    #[serde(flatten)]
    pub outcome: TraceOutcome,
}

impl EvaluationResult {
    pub fn compile_error(trace_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            outcome: TraceOutcome::CompileError {
                message: message.into(),
            },
        }
    }

    pub fn runtime_error(trace_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            outcome: TraceOutcome::RuntimeError {
                message: message.into(),
            },
        }
    }

    pub fn score(trace_id: impl Into<String>, value: f64) -> Self {
        Self {
            trace_id: trace_id.into(),
            outcome: TraceOutcome::Score { value },
        }
    }
}

/// Hit rate rounded to four decimals; zero accesses score exactly `0.0`.
pub fn hit_rate(total: u64, hits: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = (hits.min(total) as f64) / (total as f64);
    (rate * 10_000.0).round() / 10_000.0
}

/// Render a score the way it is written to history.
pub fn format_score(value: f64) -> String {
    format!("{value:.4}")
}

/// One line of the score history: `trace,kind,payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub trace_id: String,
    pub kind: OutcomeKind,
    /// `0` for error kinds, the four-decimal score otherwise.
    pub payload: String,
}

impl ScoreHistoryEntry {
    /// Synthetic entry for an evaluation killed at its deadline.
    pub fn timeout() -> Self {
        Self {
            trace_id: TIMEOUT_TRACE_ID.to_string(),
            kind: OutcomeKind::Timeout,
            payload: "0".to_string(),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{},{},{}", self.trace_id, self.kind, self.payload)
    }
}

impl From<&EvaluationResult> for ScoreHistoryEntry {
    fn from(result: &EvaluationResult) -> Self {
        let payload = match &result.outcome {
            TraceOutcome::Score { value } => format_score(*value),
            TraceOutcome::CompileError { .. } | TraceOutcome::RuntimeError { .. } => {
                "0".to_string()
            }
        };
        Self {
            trace_id: result.trace_id.clone(),
            kind: result.outcome.kind(),
            payload,
        }
    }
}

/// A candidate copied into the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedCandidate {
    pub candidate_file: String,
    pub score: f64,
    pub stored_at: PathBuf,
    pub accepted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_rounds_to_four_decimals() {
        assert_eq!(hit_rate(1000, 800), 0.8);
        assert_eq!(hit_rate(3, 1), 0.3333);
        assert_eq!(format_score(hit_rate(1000, 800)), "0.8000");
    }

    #[test]
    fn test_hit_rate_zero_total_is_zero() {
        assert_eq!(hit_rate(0, 0), 0.0);
        assert_eq!(hit_rate(0, 5), 0.0);
    }

    #[test]
    fn test_hit_rate_never_exceeds_one() {
        assert_eq!(hit_rate(10, 50), 1.0);
    }

    #[test]
    fn test_history_entry_payloads() {
        let ok = ScoreHistoryEntry::from(&EvaluationResult::score("mcf.trace.gz", 0.8));
        assert_eq!(ok.to_line(), "mcf.trace.gz,Score,0.8000");

        let ce = ScoreHistoryEntry::from(&EvaluationResult::compile_error("mcf.trace.gz", "boom"));
        assert_eq!(ce.to_line(), "mcf.trace.gz,CompileError,0");

        let re = ScoreHistoryEntry::from(&EvaluationResult::runtime_error("lbm.trace.gz", "x"));
        assert_eq!(re.to_line(), "lbm.trace.gz,RuntimeError,0");

        assert_eq!(ScoreHistoryEntry::timeout().to_line(), "*,Timeout,0");
    }

    #[test]
    fn test_evaluation_result_json_shape() {
        let r = EvaluationResult::score("t.gz", 0.5);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["trace_id"], "t.gz");
        assert_eq!(json["type"], "score");
        assert_eq!(json["value"], 0.5);
    }

    #[test]
    fn test_outcome_kind_display() {
        assert_eq!(OutcomeKind::CompileError.to_string(), "CompileError");
        assert!(OutcomeKind::Timeout.is_error());
        assert!(!OutcomeKind::Score.is_error());
    }
}
