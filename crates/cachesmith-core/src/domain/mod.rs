//! Domain types shared by the harness, the classifier and the controller.

pub mod candidate;
pub mod config;
pub mod error;
pub mod evaluation;

pub use candidate::Candidate;
pub use config::{ConfigId, EvolutionConfig, ProcessGroup, SimulationConfig, Toolchain};
pub use error::{EvoError, Result};
pub use evaluation::{
    format_score, hit_rate, AcceptedCandidate, EvaluationResult, OutcomeKind, ScoreHistoryEntry,
    TraceOutcome, MARKER_NOT_FOUND, TIMEOUT_TRACE_ID,
};
