//! Simulator execution for a single trace.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{hit_rate, EvaluationResult, ProcessGroup, MARKER_NOT_FOUND};
use crate::sandbox::run_captured_in;

use super::metric::parse_llc_total;

/// Identifier of a trace: its file name, or the whole path when it has none.
pub fn trace_id(trace: &Path) -> String {
    trace
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| trace.to_string_lossy().into_owned())
}

/// Run `binary` on one trace and turn whatever happens into a result.
///
/// Never fails: spawn errors and bad exits become `RuntimeError` so the
/// caller can keep going with the next trace.
pub async fn run_trace(
    binary: &Path,
    trace: &Path,
    warmup: u64,
    sim: u64,
    group: ProcessGroup,
) -> EvaluationResult {
    let id = trace_id(trace);
    let warmup = warmup.to_string();
    let sim = sim.to_string();
    let args: [&OsStr; 6] = [
        OsStr::new("-warmup_instructions"),
        OsStr::new(&warmup),
        OsStr::new("-simulation_instructions"),
        OsStr::new(&sim),
        OsStr::new("-traces"),
        trace.as_os_str(),
    ];

    let output = match run_captured_in(binary, &args[..], group).await {
        Ok(output) => output,
        Err(err) => {
            warn!(trace = %id, error = %err, "simulator could not be started");
            return EvaluationResult::runtime_error(id, err.to_string());
        }
    };

    if !output.success() {
        let status = output
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        warn!(trace = %id, status = %status, "simulator exited abnormally");
        return EvaluationResult::runtime_error(
            id,
            format!("simulator exited with status {status}: {}", output.stderr.trim()),
        );
    }

    match parse_llc_total(&output.combined()) {
        Some(stats) => {
            let score = hit_rate(stats.accesses, stats.hits);
            debug!(
                trace = %id,
                accesses = stats.accesses,
                hits = stats.hits,
                misses = stats.misses,
                score = score,
                "trace simulated"
            );
            EvaluationResult::score(id, score)
        }
        None => EvaluationResult::runtime_error(id, MARKER_NOT_FOUND),
    }
}
