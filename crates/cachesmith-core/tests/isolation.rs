#![cfg(unix)]

//! Deadline enforcement around a real harness invocation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cachesmith_core::{
    classify, evaluate, run_with_timeout, CandidateWorkspace, ConfigId, Harness, Outcome,
    SandboxError, SimulationConfig, SubprocessHarness, Toolchain, WrapperOutcome,
};

/// `sh fake_cc.sh -o out src lib` copies `src` to `out` as an executable.
const FAKE_CC: &str = "#!/bin/sh\ncp \"$3\" \"$2\" && chmod +x \"$2\"\n";

fn sim_config(dir: &Path) -> SimulationConfig {
    let cc = dir.join("fake_cc.sh");
    fs::write(&cc, FAKE_CC).unwrap();
    SimulationConfig {
        config: ConfigId::Config2,
        traces: vec![dir.join("mcf.trace.gz")],
        warmup_instructions: 1,
        simulation_instructions: 1,
        binary_dir: dir.join("bin"),
        toolchain: Toolchain {
            compiler: PathBuf::from("sh"),
            flags: vec![cc.to_string_lossy().into_owned()],
            lib_dir: dir.join("lib"),
        },
        ..SimulationConfig::default()
    }
}

/// Alive and not a zombie.
fn is_running(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn wait_until_dead(pid: u32) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while is_running(pid) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn hung_simulator_is_killed_at_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("sleeper.pid");
    let sim = sim_config(dir.path());
    let workspace = CandidateWorkspace::new(dir.path().join("candidates"), "cache_policy").unwrap();
    let candidate = workspace
        .write(
            1,
            &format!(
                "#!/bin/sh\nsleep 30 &\necho $! > '{}'\nwait\n",
                pid_file.display()
            ),
        )
        .unwrap();

    let start = Instant::now();
    let outcome = run_with_timeout(Duration::from_millis(1500), async move {
        evaluate(&candidate, &sim).await
    })
    .await;
    let elapsed = start.elapsed();

    assert_eq!(outcome, WrapperOutcome::TimedOut { limit_ms: 1500 });
    assert!(outcome.results().is_empty());
    assert_eq!(classify(&outcome), Outcome::Timeout);
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");

    // The grandchild shares the simulator's process group and dies with it.
    let pid: u32 = fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    wait_until_dead(pid).await;
    assert!(!is_running(pid), "sleep {pid} survived the timeout");
}

#[tokio::test]
async fn subprocess_harness_tree_is_killed_at_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("detached.pid");
    let script = dir.path().join("stuck_simulate.sh");
    fs::write(
        &script,
        format!(
            "sleep 30 </dev/null >/dev/null 2>&1 &\necho $! > '{}'\nwait\n",
            pid_file.display()
        ),
    )
    .unwrap();
    let workspace = CandidateWorkspace::new(dir.path().join("candidates"), "cache_policy").unwrap();
    let candidate = workspace.write(1, "// policy").unwrap();
    let harness =
        SubprocessHarness::new("sh", sim_config(dir.path())).with_leading_args([script]);

    let start = Instant::now();
    let outcome = run_with_timeout(Duration::from_millis(1000), async move {
        harness.evaluate(&candidate).await
    })
    .await;

    assert_eq!(outcome, WrapperOutcome::TimedOut { limit_ms: 1000 });
    assert!(start.elapsed() < Duration::from_secs(5));

    let pid: u32 = fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    wait_until_dead(pid).await;
    assert!(!is_running(pid), "sleep {pid} outlived the evaluation process");
}

#[tokio::test]
async fn fast_harness_completes_inside_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let sim = sim_config(dir.path());
    let workspace = CandidateWorkspace::new(dir.path().join("candidates"), "cache_policy").unwrap();
    let candidate = workspace
        .write(1, "#!/bin/sh\necho 'LLC TOTAL ACCESS: 10 HIT: 9 MISS: 1'\n")
        .unwrap();

    let outcome = run_with_timeout(Duration::from_secs(30), async move {
        evaluate(&candidate, &sim).await
    })
    .await;

    assert!(outcome.is_completed());
    assert_eq!(
        classify(&outcome),
        Outcome::Score {
            trace_id: "mcf.trace.gz".into(),
            value: 0.9
        }
    );
}

#[tokio::test]
async fn machinery_failure_is_unclassified() {
    let outcome = run_with_timeout(Duration::from_secs(5), async {
        Err::<Vec<_>, _>(SandboxError::Spawn {
            program: "g++".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    })
    .await;

    match classify(&outcome) {
        Outcome::Unclassified { reason } => assert!(reason.contains("g++")),
        other => panic!("expected unclassified, got {other:?}"),
    }
}
