//! One toolchain invocation per (candidate, configuration).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::{Candidate, ConfigId, ProcessGroup, Toolchain};
use crate::sandbox::{run_captured_in, SandboxResult};

/// Result of invoking the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The binary was produced at this path.
    Built(PathBuf),
    /// The toolchain exited non-zero; its diagnostic text.
    Rejected(String),
}

/// `<stem>-<config>-<timestamp>`, with millisecond resolution so retries of
/// the same candidate never collide.
pub fn binary_name(candidate: &Candidate, config: ConfigId) -> String {
    let ts = Utc::now().format("%Y%m%d%H%M%S%3f");
    format!("{}-{}-{}", candidate.stem(), config, ts)
}

/// Full argument list: `<flags…> -o <binary> <source> <lib>`.
pub fn compile_args(
    toolchain: &Toolchain,
    config: ConfigId,
    source: &Path,
    binary: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = toolchain.flags.iter().map(OsString::from).collect();
    args.push("-o".into());
    args.push(binary.as_os_str().to_owned());
    args.push(source.as_os_str().to_owned());
    args.push(toolchain.library(config).into_os_string());
    args
}

/// Compile `candidate` for `config` into `binary_dir`.
pub async fn compile_candidate(
    candidate: &Candidate,
    config: ConfigId,
    toolchain: &Toolchain,
    binary_dir: &Path,
    group: ProcessGroup,
) -> SandboxResult<CompileOutcome> {
    tokio::fs::create_dir_all(binary_dir).await?;
    let binary = binary_dir.join(binary_name(candidate, config));
    let args = compile_args(toolchain, config, &candidate.path, &binary);

    info!(
        candidate = %candidate.file_name,
        config = %config,
        binary = %binary.display(),
        "compiling candidate"
    );
    let output = run_captured_in(&toolchain.compiler, args.as_slice(), group).await?;

    if output.success() {
        debug!(duration_ms = output.duration_ms, "compilation succeeded");
        Ok(CompileOutcome::Built(binary))
    } else {
        debug!(exit_code = ?output.exit_code, "compilation rejected");
        Ok(CompileOutcome::Rejected(output.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            file_name: "cache_policy_1.cc".into(),
            version: 1,
            path: PathBuf::from("/work/cache_policy_1.cc"),
            source: String::new(),
        }
    }

    #[test]
    fn test_binary_name_embeds_identity_and_config() {
        let name = binary_name(&candidate(), ConfigId::Config2);
        assert!(name.starts_with("cache_policy_1-config2-"));
        let ts = name.rsplit('-').next().unwrap();
        assert_eq!(ts.len(), 17);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_compile_args_layout() {
        let tc = Toolchain {
            lib_dir: PathBuf::from("/lib/champsim"),
            ..Toolchain::default()
        };
        let args = compile_args(
            &tc,
            ConfigId::Config1,
            Path::new("/work/p.cc"),
            Path::new("/bin/p-config1-1"),
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-Wall",
                "--std=c++11",
                "-o",
                "/bin/p-config1-1",
                "/work/p.cc",
                "/lib/champsim/config1.a"
            ]
        );
    }
}
