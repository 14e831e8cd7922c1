//! Candidate policies produced by the oracle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One generated policy, frozen once it has been written to the workspace.
///
/// `version` increases by one with every generation in a run, so each
/// candidate lives in its own file and a prior source stays readable after
/// the next generation lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// File name inside the candidate workspace (e.g. `cache_policy_3.cc`).
    pub file_name: String,
    /// Generation counter, starting at 1.
    pub version: u32,
    /// Full path of the written source file.
    pub path: PathBuf,
    /// Source text as produced by the oracle.
    pub source: String,
}

impl Candidate {
    /// File name without its extension; embedded in binary names.
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }
}
