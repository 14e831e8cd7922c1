//! Candidate workspace: where generated sources are written before they are
//! compiled.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::Candidate;

use super::{StoreError, StoreResult};

/// Writes `<prefix>_<version>.cc` files into one directory.
#[derive(Debug, Clone)]
pub struct CandidateWorkspace {
    dir: PathBuf,
    prefix: String,
}

impl CandidateWorkspace {
    pub fn new(dir: impl AsRef<Path>, prefix: impl Into<String>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, version: u32) -> String {
        format!("{}_{}.cc", self.prefix, version)
    }

    /// Write generation `version` and return the frozen candidate.
    pub fn write(&self, version: u32, source: &str) -> StoreResult<Candidate> {
        let file_name = self.file_name(version);
        let path = self.dir.join(&file_name);
        fs::write(&path, source)?;
        debug!(path = %path.display(), bytes = source.len(), "candidate written");
        Ok(Candidate {
            file_name,
            version,
            path,
            source: source.to_string(),
        })
    }

    /// Re-read a candidate's source from disk.
    pub fn load(&self, candidate: &Candidate) -> StoreResult<String> {
        fs::read_to_string(&candidate.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::SourceNotFound(candidate.path.clone())
            } else {
                StoreError::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let ws = CandidateWorkspace::new(dir.path().join("gen"), "cache_policy").unwrap();
        let c = ws.write(1, "int x;").unwrap();
        assert_eq!(c.file_name, "cache_policy_1.cc");
        assert_eq!(c.path, dir.path().join("gen").join("cache_policy_1.cc"));
        assert_eq!(ws.load(&c).unwrap(), "int x;");
    }

    #[test]
    fn versions_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let ws = CandidateWorkspace::new(dir.path(), "p").unwrap();
        let first = ws.write(1, "a").unwrap();
        let second = ws.write(2, "b").unwrap();
        assert_ne!(first.path, second.path);
        assert_eq!(ws.load(&first).unwrap(), "a");
    }

    #[test]
    fn load_missing_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ws = CandidateWorkspace::new(dir.path(), "p").unwrap();
        let c = ws.write(1, "a").unwrap();
        fs::remove_file(&c.path).unwrap();
        assert!(matches!(ws.load(&c), Err(StoreError::SourceNotFound(_))));
    }
}
