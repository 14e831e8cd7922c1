//! Build-and-run harness: compile a candidate once, then replay every trace.
//!
//! The harness never aborts on a per-trace failure. A rejected compile turns
//! into one identical `CompileError` per trace without running anything.
//! [`SubprocessHarness`] runs the same pipeline in a killable child process.

pub mod compile;
pub mod metric;
pub mod run;
pub mod subprocess;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{Candidate, EvaluationResult, SimulationConfig};
use crate::sandbox::SandboxResult;

pub use compile::{binary_name, compile_args, compile_candidate, CompileOutcome};
pub use metric::{parse_llc_total, LlcStats};
pub use run::{run_trace, trace_id};
pub use subprocess::SubprocessHarness;

/// Something that can turn a candidate into per-trace results.
///
/// An `Err` means the invocation machinery broke (e.g. the compiler could not
/// be started); it is not attributable to the candidate.
#[async_trait]
pub trait Harness: Send + Sync {
    async fn evaluate(&self, candidate: &Candidate) -> SandboxResult<Vec<EvaluationResult>>;
}

/// In-process ChampSim CRC2 harness bound to one simulation configuration.
#[derive(Debug, Clone)]
pub struct ChampSimHarness {
    config: SimulationConfig,
}

impl ChampSimHarness {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[async_trait]
impl Harness for ChampSimHarness {
    async fn evaluate(&self, candidate: &Candidate) -> SandboxResult<Vec<EvaluationResult>> {
        evaluate(candidate, &self.config).await
    }
}

/// Compile `candidate` for `sim.config` and run it on each of `sim.traces`.
pub async fn evaluate(
    candidate: &Candidate,
    sim: &SimulationConfig,
) -> SandboxResult<Vec<EvaluationResult>> {
    let binary = match compile_candidate(
        candidate,
        sim.config,
        &sim.toolchain,
        &sim.binary_dir,
        sim.process_group,
    )
    .await?
    {
        CompileOutcome::Built(binary) => binary,
        CompileOutcome::Rejected(diagnostic) => {
            info!(
                candidate = %candidate.file_name,
                traces = sim.traces.len(),
                "compile rejected; skipping simulation"
            );
            return Ok(sim
                .traces
                .iter()
                .map(|t| EvaluationResult::compile_error(trace_id(t), diagnostic.clone()))
                .collect());
        }
    };

    let mut results = Vec::with_capacity(sim.traces.len());
    for trace in &sim.traces {
        results.push(
            run_trace(
                &binary,
                trace,
                sim.warmup_instructions,
                sim.simulation_instructions,
                sim.process_group,
            )
            .await,
        );
    }
    Ok(results)
}
