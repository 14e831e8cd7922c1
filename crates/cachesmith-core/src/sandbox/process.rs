//! Child processes that die with their owner.
//!
//! By default a command is spawned as the leader of a fresh process group,
//! and the whole group is killed through [`ProcessGroupGuard`] once the call
//! returns or its future is dropped. A compiler driver or simulator cannot
//! leave grandchildren running. With [`ProcessGroup::Inherit`] the command
//! stays in the caller's group and the caller's own guard covers it.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::domain::ProcessGroup;

use super::error::{SandboxError, SandboxResult};

/// Captured result of one finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

/// Sends SIGKILL to a whole process group when dropped.
///
/// The guard stays armed after the leader exits: a detached grandchild with
/// its stdio closed is still a member of the group and dies with it.
#[derive(Debug)]
pub struct ProcessGroupGuard {
    pgid: Option<i32>,
}

impl ProcessGroupGuard {
    pub fn new(leader_pid: Option<u32>) -> Self {
        Self {
            pgid: leader_pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    // SAFETY: killpg has no memory-safety preconditions; ESRCH (group already
    // empty) is expected and ignored.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    debug!(pgid = pgid, rc = rc, "killed process group");
}

#[cfg(not(unix))]
fn kill_group(_pgid: i32) {}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    duration_ms(start.elapsed())
}

/// Run `program args…` as the leader of a fresh process group.
pub async fn run_captured<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
) -> SandboxResult<CapturedOutput> {
    run_captured_in(program, args, ProcessGroup::Own).await
}

/// Run `program args…` to completion, capturing stdout and stderr.
///
/// With [`ProcessGroup::Own`] the child leads a new group that is killed when
/// the call returns or its future is dropped. With [`ProcessGroup::Inherit`]
/// the child stays in the caller's group, so whoever owns that group can kill
/// the whole tree at once.
pub async fn run_captured_in<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    group: ProcessGroup,
) -> SandboxResult<CapturedOutput> {
    let program = program.as_ref();
    let start = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    if group == ProcessGroup::Own {
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(|source| SandboxError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let _guard = match group {
        ProcessGroup::Own => ProcessGroupGuard::new(child.id()),
        ProcessGroup::Inherit => ProcessGroupGuard::new(None),
    };

    let output = child.wait_with_output().await?;

    let duration_ms = elapsed_ms(start);
    debug!(
        program = %program.to_string_lossy(),
        exit_code = ?output.status.code(),
        duration_ms = duration_ms,
        "process finished"
    );

    Ok(CapturedOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::from_micros(999)), 0);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_run_captured_echo() {
        let out = run_captured("echo", &["hello"]).await.expect("echo runs");
        assert!(out.success());
        assert!(out.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_captured_failure_keeps_stderr() {
        let out = run_captured("sh", &["-c", "echo oops >&2; exit 3"])
            .await
            .expect("sh runs");
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_captured_combined_order() {
        let out = run_captured("sh", &["-c", "echo out; echo err >&2"])
            .await
            .expect("sh runs");
        assert_eq!(out.combined(), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_captured("/definitely/not/a/program", &[] as &[&str])
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Spawn { .. }));
    }

    /// Alive and not a zombie.
    fn is_running(pid: u32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .ok()
            .and_then(|stat| {
                stat.rsplit_once(')')
                    .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            })
            .unwrap_or(false)
    }

    #[test]
    fn test_empty_guard_does_nothing() {
        drop(ProcessGroupGuard::new(None));
        drop(ProcessGroupGuard::new(Some(u32::MAX)));
    }

    #[tokio::test]
    async fn test_detached_grandchild_dies_with_group() {
        let out = run_captured(
            "sh",
            &["-c", "sleep 30 </dev/null >/dev/null 2>&1 & echo $!"],
        )
        .await
        .expect("sh runs");
        assert!(out.success());
        let pid: u32 = out.stdout.trim().parse().unwrap();

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while is_running(pid) && Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!is_running(pid), "detached sleep {pid} outlived its group");
    }

    #[tokio::test]
    async fn test_inherited_group_runs_to_completion() {
        let out = run_captured_in("sh", &["-c", "echo inherited"], ProcessGroup::Inherit)
            .await
            .expect("sh runs");
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "inherited");
    }
}
