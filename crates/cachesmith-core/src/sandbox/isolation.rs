//! Timeout-bounded execution of one harness invocation.
//!
//! The harness future is driven on a blocking-pool thread, so a harness stuck
//! in a blocking call never occupies the controller's thread. The controller
//! joins it with a deadline. On expiry the harness is sent a cancel signal,
//! which drops its future and kills every process group it owned, and gets
//! [`CANCEL_GRACE`] to unwind. A harness that cannot unwind is abandoned and
//! the timeout is reported anyway; real evaluations run as a child process
//! (see `SubprocessHarness`) so cancellation always reaches them.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::EvaluationResult;

use super::process::{duration_ms, elapsed_ms};

/// How long a cancelled harness may take to drop its state.
pub const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// What the isolated harness invocation came back with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WrapperOutcome {
    /// Finished inside the deadline; results are in trace order.
    Completed { results: Vec<EvaluationResult> },
    /// Killed at the deadline. No partial results are kept.
    TimedOut { limit_ms: u64 },
    /// The invocation machinery itself failed (error or panic).
    Failed { reason: String },
}

impl WrapperOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WrapperOutcome::Completed { .. })
    }

    /// Results of a completed run, empty otherwise.
    pub fn results(&self) -> &[EvaluationResult] {
        match self {
            WrapperOutcome::Completed { results } => results,
            WrapperOutcome::TimedOut { .. } | WrapperOutcome::Failed { .. } => &[],
        }
    }
}

/// Run `harness_call` off the caller's thread and wait at most `timeout`.
///
/// Returns no later than `timeout + CANCEL_GRACE`, whatever the harness does.
pub async fn run_with_timeout<Fut, E>(timeout: Duration, harness_call: Fut) -> WrapperOutcome
where
    Fut: Future<Output = Result<Vec<EvaluationResult>, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let limit_ms = duration_ms(timeout);
    let start = Instant::now();
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let runtime = Handle::current();
    let mut handle = tokio::task::spawn_blocking(move || {
        runtime.block_on(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => None,
                result = harness_call => Some(result),
            }
        })
    });

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Some(Ok(results)))) => {
            debug!(
                results = results.len(),
                elapsed_ms = elapsed_ms(start),
                "isolated harness completed"
            );
            WrapperOutcome::Completed { results }
        }
        Ok(Ok(Some(Err(err)))) => WrapperOutcome::Failed {
            reason: err.to_string(),
        },
        Ok(Ok(None)) => WrapperOutcome::Failed {
            reason: "harness cancelled before the deadline".to_string(),
        },
        Ok(Err(join_err)) => WrapperOutcome::Failed {
            reason: if join_err.is_panic() {
                "harness task panicked".to_string()
            } else {
                format!("harness task did not finish: {join_err}")
            },
        },
        Err(_elapsed) => {
            // Err only when the harness already finished and dropped the receiver.
            let _ = cancel_tx.send(());
            match tokio::time::timeout(CANCEL_GRACE, &mut handle).await {
                Ok(_) => debug!("cancelled harness unwound"),
                Err(_) => warn!(
                    grace_ms = duration_ms(CANCEL_GRACE),
                    "harness ignored cancellation; abandoning its thread"
                ),
            }
            warn!(limit_ms = limit_ms, "harness exceeded its deadline and was killed");
            WrapperOutcome::TimedOut { limit_ms }
        }
    }
}
