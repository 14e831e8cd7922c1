//! Error types for the sandbox module.

/// Errors produced by the sandbox layer.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("harness process exited with status {status}: {stderr}")]
    HarnessExited { status: String, stderr: String },

    #[error("harness output is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
