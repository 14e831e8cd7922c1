//! Domain-level error taxonomy for cachesmith.

use crate::oracle::OracleError;
use crate::sandbox::SandboxError;
use crate::store::StoreError;

/// cachesmith domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvoError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown simulator configuration: {0}")]
    UnknownConfiguration(String),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cachesmith domain operations.
pub type Result<T> = std::result::Result<T, EvoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evo_error_display() {
        let err = EvoError::InvalidConfig("iterations must be at least 1".to_string());
        assert!(err.to_string().contains("invalid configuration"));

        let err = EvoError::UnknownConfiguration("config9".to_string());
        assert!(err.to_string().contains("config9"));
    }

    #[test]
    fn test_oracle_error_converts() {
        let err: EvoError = OracleError::NoCodeBlock.into();
        assert!(err.to_string().starts_with("oracle error"));
    }
}
