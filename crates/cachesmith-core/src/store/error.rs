//! Error types for the persistence layer.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("candidate source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("no free file name for {0} after {1} attempts")]
    NameExhausted(String, u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
