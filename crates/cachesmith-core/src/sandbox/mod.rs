//! Sandbox: isolated, deadline-bounded execution of candidate builds and runs.
//!
//! # Modules
//!
//! - [`process`]  : `run_captured()`, process-group spawning and kill guard
//! - [`isolation`]: `run_with_timeout()` and `WrapperOutcome`
//! - [`error`]    : `SandboxError` / `SandboxResult`

pub mod error;
pub mod isolation;
pub mod process;

pub use error::{SandboxError, SandboxResult};
pub use isolation::{run_with_timeout, WrapperOutcome};
pub use process::{run_captured, run_captured_in, CapturedOutput, ProcessGroupGuard};
