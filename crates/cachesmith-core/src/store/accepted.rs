//! Durable store of candidates that met the acceptance threshold.
//!
//! An entry is named after the candidate file with its trailing `_N` field
//! replaced by a timestamp and the score appended. Files are opened with
//! `create_new`, so an existing entry is never overwritten.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{format_score, AcceptedCandidate, Candidate};

use super::{StoreError, StoreResult};

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Persists accepted candidates.
pub trait AcceptedStore: Send + Sync {
    fn accept(&self, candidate: &Candidate, score: f64) -> StoreResult<AcceptedCandidate>;
}

/// Entry name for `file_name` accepted at `at` with `score`.
///
/// `cache_policy_3.cc` at 2026-10-18 12:00:00 with 0.8 becomes
/// `cache_policy_20261018120000_0.8000.cc`.
pub fn accepted_file_name(file_name: &str, score: f64, at: DateTime<Utc>) -> String {
    let (base, ext) = accepted_name_parts(file_name, score, at);
    format!("{base}{ext}")
}

/// Name without and with its extension (`.cc`, possibly empty).
fn accepted_name_parts(file_name: &str, score: f64, at: DateTime<Utc>) -> (String, String) {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let ts = at.format("%Y%m%d%H%M%S").to_string();
    let base = match stem.rsplit_once('_') {
        Some((head, _)) => format!("{head}_{ts}"),
        None => ts,
    };
    (format!("{base}_{}", format_score(score)), ext)
}

/// Filesystem-backed accepted store (the reference-policy directory).
#[derive(Debug, Clone)]
pub struct FsAcceptedStore {
    dir: PathBuf,
}

impl FsAcceptedStore {
    pub fn new(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn create_unique(&self, base: &str, ext: &str, contents: &[u8]) -> StoreResult<PathBuf> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate_name = if attempt == 0 {
                format!("{base}{ext}")
            } else {
                format!("{base}-{attempt}{ext}")
            };
            let path = self.dir.join(&candidate_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(contents)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::NameExhausted(
            format!("{base}{ext}"),
            MAX_NAME_ATTEMPTS,
        ))
    }
}

impl AcceptedStore for FsAcceptedStore {
    fn accept(&self, candidate: &Candidate, score: f64) -> StoreResult<AcceptedCandidate> {
        let contents = fs::read(&candidate.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::SourceNotFound(candidate.path.clone())
            } else {
                StoreError::Io(e)
            }
        })?;

        let accepted_at = Utc::now();
        let (base, ext) = accepted_name_parts(&candidate.file_name, score, accepted_at);
        let stored_at = self.create_unique(&base, &ext, &contents)?;
        info!(
            candidate = %candidate.file_name,
            score = score,
            stored_at = %stored_at.display(),
            "candidate persisted"
        );

        Ok(AcceptedCandidate {
            candidate_file: candidate.file_name.clone(),
            score,
            stored_at,
            accepted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write_candidate(dir: &Path, name: &str, body: &str) -> Candidate {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        Candidate {
            file_name: name.to_string(),
            version: 1,
            path,
            source: body.to_string(),
        }
    }

    #[test]
    fn test_accepted_file_name() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        assert_eq!(
            accepted_file_name("cache_policy_3.cc", 0.8, at),
            "cache_policy_20261018120000_0.8000.cc"
        );
        assert_eq!(
            accepted_file_name("policy.cc", 0.75, at),
            "20261018120000_0.7500.cc"
        );
    }

    #[test]
    fn test_accept_copies_source() {
        let work = tempfile::tempdir().unwrap();
        let db = tempfile::tempdir().unwrap();
        let candidate = write_candidate(work.path(), "cache_policy_1.cc", "// lru\n");

        let store = FsAcceptedStore::new(db.path()).unwrap();
        let accepted = store.accept(&candidate, 0.8).unwrap();

        assert_eq!(accepted.score, 0.8);
        assert!(accepted.stored_at.starts_with(db.path()));
        let name = accepted.stored_at.file_name().unwrap().to_string_lossy();
        assert!(name.ends_with("_0.8000.cc"), "{name}");
        assert_eq!(fs::read_to_string(&accepted.stored_at).unwrap(), "// lru\n");
    }

    #[test]
    fn test_accept_never_overwrites() {
        let work = tempfile::tempdir().unwrap();
        let db = tempfile::tempdir().unwrap();
        let candidate = write_candidate(work.path(), "cache_policy_1.cc", "// v1\n");
        let store = FsAcceptedStore::new(db.path()).unwrap();

        let first = store.accept(&candidate, 0.8).unwrap();
        let second = store.accept(&candidate, 0.8).unwrap();

        assert_ne!(first.stored_at, second.stored_at);
        assert_eq!(fs::read_dir(db.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let db = tempfile::tempdir().unwrap();
        let store = FsAcceptedStore::new(db.path()).unwrap();
        let candidate = Candidate {
            file_name: "gone_1.cc".into(),
            version: 1,
            path: db.path().join("nope").join("gone_1.cc"),
            source: String::new(),
        };
        assert!(matches!(
            store.accept(&candidate, 0.9),
            Err(StoreError::SourceNotFound(_))
        ));
    }
}
