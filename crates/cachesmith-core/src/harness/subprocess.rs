//! Harness that evaluates in a separate `cachesmith simulate` process.
//!
//! The child leads its own process group and keeps its compiler and
//! simulator children in that group, so killing the group at the deadline
//! tears down the whole evaluation even if it is stuck in a blocking wait.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Candidate, EvaluationResult, SimulationConfig};
use crate::sandbox::{run_captured, SandboxError, SandboxResult};

use super::Harness;

const MAX_STDERR: usize = 2000;

/// Runs each evaluation as `<program> [leading args] simulate <policy> ...`.
#[derive(Debug, Clone)]
pub struct SubprocessHarness {
    program: PathBuf,
    leading_args: Vec<OsString>,
    sim: SimulationConfig,
}

impl SubprocessHarness {
    /// `program` must understand the `simulate` command line, normally the
    /// running `cachesmith` binary.
    pub fn new(program: impl Into<PathBuf>, sim: SimulationConfig) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            sim,
        }
    }

    /// Arguments placed before the `simulate` command line (e.g. a script
    /// path when `program` is an interpreter).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn sim(&self) -> &SimulationConfig {
        &self.sim
    }

    /// Full argument list for evaluating `candidate`. Traces come last.
    pub fn args(&self, candidate: &Candidate) -> Vec<OsString> {
        let sim = &self.sim;
        let mut args = self.leading_args.clone();
        args.extend([
            OsString::from("--no-log-file"),
            OsString::from("simulate"),
            candidate.path.clone().into_os_string(),
            OsString::from("--config"),
            OsString::from(sim.config.name()),
            OsString::from("--warmup"),
            OsString::from(sim.warmup_instructions.to_string()),
            OsString::from("--sim"),
            OsString::from(sim.simulation_instructions.to_string()),
            OsString::from("--outdir"),
            sim.binary_dir.clone().into_os_string(),
            OsString::from("--lib-dir"),
            sim.toolchain.lib_dir.clone().into_os_string(),
            OsString::from("--cxx"),
            sim.toolchain.compiler.clone().into_os_string(),
            OsString::from("--inherit-process-group"),
        ]);
        for flag in &sim.toolchain.flags {
            args.push(OsString::from(format!("--cxx-flag={flag}")));
        }
        args.push(OsString::from("--traces"));
        args.extend(sim.traces.iter().map(|t| t.clone().into_os_string()));
        args
    }
}

#[async_trait]
impl Harness for SubprocessHarness {
    async fn evaluate(&self, candidate: &Candidate) -> SandboxResult<Vec<EvaluationResult>> {
        let output = run_captured(&self.program, self.args(candidate).as_slice()).await?;
        if !output.success() {
            let status = output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let mut stderr = output.stderr.trim().to_string();
            if stderr.len() > MAX_STDERR {
                let cut = (0..=MAX_STDERR)
                    .rev()
                    .find(|i| stderr.is_char_boundary(*i))
                    .unwrap_or(0);
                stderr.truncate(cut);
            }
            return Err(SandboxError::HarnessExited { status, stderr });
        }

        let results: Vec<EvaluationResult> = serde_json::from_str(output.stdout.trim())?;
        debug!(
            candidate = %candidate.file_name,
            results = results.len(),
            duration_ms = output.duration_ms,
            "subprocess harness finished"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigId, Toolchain, TraceOutcome};

    fn candidate(path: PathBuf) -> Candidate {
        Candidate {
            file_name: "cache_policy_1.cc".into(),
            version: 1,
            path,
            source: String::new(),
        }
    }

    fn sim() -> SimulationConfig {
        SimulationConfig {
            config: ConfigId::Config3,
            traces: vec![PathBuf::from("/t/mcf.trace.gz"), PathBuf::from("/t/lbm.trace.gz")],
            warmup_instructions: 10,
            simulation_instructions: 20,
            binary_dir: PathBuf::from("/out"),
            toolchain: Toolchain::default(),
            ..SimulationConfig::default()
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_carry_simulation_settings() {
        let h = SubprocessHarness::new("cachesmith", sim());
        let args = strings(h.args(&candidate(PathBuf::from("/w/cache_policy_1.cc"))));

        assert_eq!(&args[..3], ["--no-log-file", "simulate", "/w/cache_policy_1.cc"]);
        assert!(args.windows(2).any(|w| w == ["--config", "config3"]));
        assert!(args.windows(2).any(|w| w == ["--warmup", "10"]));
        assert!(args.windows(2).any(|w| w == ["--sim", "20"]));
        assert!(args.windows(2).any(|w| w == ["--cxx", "g++"]));
        assert!(args.contains(&"--inherit-process-group".to_string()));
        assert!(args.contains(&"--cxx-flag=--std=c++11".to_string()));
        assert_eq!(
            &args[args.len() - 3..],
            ["--traces", "/t/mcf.trace.gz", "/t/lbm.trace.gz"]
        );
    }

    #[test]
    fn test_leading_args_come_first() {
        let h = SubprocessHarness::new("sh", sim()).with_leading_args(["fake.sh"]);
        let args = strings(h.args(&candidate(PathBuf::from("p.cc"))));
        assert_eq!(&args[..2], ["fake.sh", "--no-log-file"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_results_decoded_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake.sh");
        std::fs::write(
            &script,
            "echo '[{\"trace_id\":\"mcf.trace.gz\",\"type\":\"score\",\"value\":0.8}]'\n",
        )
        .unwrap();
        let h = SubprocessHarness::new("sh", sim()).with_leading_args([script]);

        let results = h.evaluate(&candidate(PathBuf::from("p.cc"))).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].trace_id, "mcf.trace.gz");
        assert_eq!(results[0].outcome, TraceOutcome::Score { value: 0.8 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_process_is_machinery_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake.sh");
        std::fs::write(&script, "echo 'unknown configuration' >&2\nexit 2\n").unwrap();
        let h = SubprocessHarness::new("sh", sim()).with_leading_args([script]);

        let err = h
            .evaluate(&candidate(PathBuf::from("p.cc")))
            .await
            .unwrap_err();
        match err {
            SandboxError::HarnessExited { status, stderr } => {
                assert_eq!(status, "2");
                assert_eq!(stderr, "unknown configuration");
            }
            other => panic!("expected HarnessExited, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_garbage_stdout_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake.sh");
        std::fs::write(&script, "echo 'not json'\n").unwrap();
        let h = SubprocessHarness::new("sh", sim()).with_leading_args([script]);

        let err = h
            .evaluate(&candidate(PathBuf::from("p.cc")))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Decode(_)));
    }
}
