//! Append-only score history.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::ScoreHistoryEntry;

use super::StoreResult;

/// Sink for history entries. Implementations only ever append.
pub trait ScoreHistory: Send + Sync {
    fn append(&self, entry: &ScoreHistoryEntry) -> StoreResult<()>;
}

/// `trace,kind,payload` lines appended to a text file.
#[derive(Debug, Clone)]
pub struct FileScoreHistory {
    path: PathBuf,
}

impl FileScoreHistory {
    /// Creates the parent directory if needed; the file itself is created on
    /// first append.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreHistory for FileScoreHistory {
    fn append(&self, entry: &ScoreHistoryEntry) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry.to_line())?;
        Ok(())
    }
}
