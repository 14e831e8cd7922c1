//! In-memory fakes for the store traits (testing only).
//!
//! `MemoryScoreHistory` and `MemoryAcceptedStore` satisfy the trait contracts
//! without touching the filesystem.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;

use crate::domain::{AcceptedCandidate, Candidate, ScoreHistoryEntry};

use super::{AcceptedStore, ScoreHistory, StoreResult};

/// History kept in a `Vec`, in append order.
#[derive(Debug, Default)]
pub struct MemoryScoreHistory {
    entries: Mutex<Vec<ScoreHistoryEntry>>,
}

impl MemoryScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ScoreHistoryEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.to_line()).collect()
    }
}

impl ScoreHistory for MemoryScoreHistory {
    fn append(&self, entry: &ScoreHistoryEntry) -> StoreResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Accepted candidates kept in a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryAcceptedStore {
    accepted: Mutex<Vec<(Candidate, AcceptedCandidate)>>,
}

impl MemoryAcceptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> Vec<AcceptedCandidate> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }

    /// Sources of accepted candidates, in acceptance order.
    pub fn sources(&self) -> Vec<String> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.source.clone())
            .collect()
    }
}

impl AcceptedStore for MemoryAcceptedStore {
    fn accept(&self, candidate: &Candidate, score: f64) -> StoreResult<AcceptedCandidate> {
        let mut accepted = self.accepted.lock().unwrap();
        let record = AcceptedCandidate {
            candidate_file: candidate.file_name.clone(),
            score,
            stored_at: PathBuf::from(format!("memory://{}", accepted.len())),
            accepted_at: Utc::now(),
        };
        accepted.push((candidate.clone(), record.clone()));
        Ok(record)
    }
}
