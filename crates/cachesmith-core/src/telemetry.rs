//! Centralised tracing initialisation for the cachesmith binary.
//!
//! Call [`init_tracing`] once at program start. The console layer writes to
//! stderr, leaving stdout for command output, and honours
//! `RUST_LOG` (falling back to the supplied level) and can emit JSON; the
//! optional file layer always records at DEBUG so a run can be audited after
//! the fact.
//!
//! Safe to call more than once; subsequent calls are silently ignored
//! (the global subscriber can only be set once per process).

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON on the console.
/// * `level`: console verbosity when `RUST_LOG` is not set.
/// * `log_file`: also append DEBUG-level plain-text lines to this file.
///
/// Fails only when the log file cannot be opened.
pub fn init_tracing(json: bool, level: Level, log_file: Option<&Path>) -> std::io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let console = if json {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console.with_filter(env_filter))
        .with(file_layer)
        .try_init()
        .ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_and_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("app.log");
        init_tracing(false, Level::INFO, Some(&log)).unwrap();
        init_tracing(true, Level::DEBUG, None).unwrap();
        assert!(log.exists());
    }
}
