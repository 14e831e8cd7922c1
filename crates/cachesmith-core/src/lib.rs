//! Cachesmith Core Library
//!
//! Evaluation-and-feedback loop for oracle-generated cache-replacement
//! policies: a build-and-run harness, a deadline-bounded isolation wrapper,
//! an outcome classifier and the evolution controller that ties them together.

pub mod classify;
pub mod controller;
pub mod domain;
pub mod harness;
pub mod metrics;
pub mod obs;
pub mod oracle;
pub mod sandbox;
pub mod store;
pub mod telemetry;

pub use classify::{classify, Outcome};

pub use controller::{EvolutionController, EvolutionReport, IterationRecord, StopReason};

pub use metrics::Metrics;

pub use domain::{
    format_score, hit_rate, AcceptedCandidate, Candidate, ConfigId, EvaluationResult, EvoError,
    EvolutionConfig, OutcomeKind, ProcessGroup, Result, ScoreHistoryEntry, SimulationConfig,
    Toolchain, TraceOutcome,
};

pub use harness::{evaluate, ChampSimHarness, Harness, SubprocessHarness};

pub use oracle::{
    ChatOracle, Oracle, OracleConfig, OracleError, OracleRequest, PromptBuilder, RequestKind,
    ScriptedOracle,
};

pub use sandbox::{run_with_timeout, SandboxError, WrapperOutcome};

pub use telemetry::init_tracing;

pub use store::{
    AcceptedStore, CandidateWorkspace, FileScoreHistory, FsAcceptedStore, ScoreHistory,
    StoreError,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
