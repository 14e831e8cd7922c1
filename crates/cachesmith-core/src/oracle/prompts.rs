//! Prompt text for each request kind.
//!
//! The initial and improvement prompts embed a few reference policies from the
//! accepted-policy directory so the oracle sees what already scores well.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::format_score;

use super::request::OracleRequest;

const MAX_REFERENCES: usize = 3;

const INTERFACE: &str = "\
The policy is a single C++11 translation unit for the ChampSim CRC2 framework. \
It must include \"../inc/champsim_crc2.h\" and define exactly these functions:
- void InitReplacementState()
- uint32_t GetVictimInSet(uint32_t cpu, uint32_t set, const BLOCK *current_set, uint64_t PC, uint64_t paddr, uint32_t type)
- void UpdateReplacementState(uint32_t cpu, uint32_t set, uint32_t way, uint64_t paddr, uint64_t PC, uint64_t victim_addr, uint32_t type, uint8_t hit)
- void PrintStats_Heartbeat()
- void PrintStats()
Reply with the complete file in one ```cpp code block.";

/// Renders [`OracleRequest`]s into prompt text.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    reference_dir: Option<PathBuf>,
}

impl PromptBuilder {
    /// `reference_dir` holds previously accepted policies (`*.cc`, `*.cpp`).
    pub fn new(reference_dir: impl AsRef<Path>) -> Self {
        Self {
            reference_dir: Some(reference_dir.as_ref().to_path_buf()),
        }
    }

    /// A builder that never embeds reference policies.
    pub fn without_references() -> Self {
        Self::default()
    }

    pub fn build(&self, request: &OracleRequest) -> String {
        match request {
            OracleRequest::Initial => {
                let mut prompt = String::from(
                    "Design a novel last-level-cache replacement policy that maximises the LLC hit rate.\n\n",
                );
                prompt.push_str(INTERFACE);
                self.push_references(&mut prompt);
                prompt
            }
            OracleRequest::FixCompile { source, diagnostic } => format!(
                "The following cache replacement policy failed to compile.\n\n\
                 Compiler output:\n{diagnostic}\n\n\
                 Source:\n```cpp\n{source}\n```\n\n\
                 Fix every error without changing the policy's intent.\n\n{INTERFACE}"
            ),
            OracleRequest::FixTimeout { source } => format!(
                "The following cache replacement policy did not finish simulating within the time limit. \
                 Remove unbounded loops and reduce per-access work so it completes quickly.\n\n\
                 Source:\n```cpp\n{source}\n```\n\n{INTERFACE}"
            ),
            OracleRequest::Improve { source, score } => {
                let mut prompt = format!(
                    "The following cache replacement policy reached an LLC hit rate of {}.\n\n\
                     Source:\n```cpp\n{source}\n```\n\n\
                     Propose an improved policy with a higher hit rate.\n\n{INTERFACE}",
                    format_score(*score)
                );
                self.push_references(&mut prompt);
                prompt
            }
        }
    }

    fn push_references(&self, prompt: &mut String) {
        let references = self.load_references();
        if references.is_empty() {
            return;
        }
        prompt.push_str("\n\nReference policies that were accepted earlier:\n");
        for (name, body) in references {
            prompt.push_str(&format!("\n// {name}\n```cpp\n{}\n```\n", body.trim()));
        }
    }

    /// Up to [`MAX_REFERENCES`] policies, newest file name first.
    fn load_references(&self) -> Vec<(String, String)> {
        let Some(dir) = &self.reference_dir else {
            return Vec::new();
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "reference directory unreadable");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("cc") | Some("cpp")
                )
            })
            .collect();
        paths.sort();
        paths.reverse();

        paths
            .into_iter()
            .take(MAX_REFERENCES)
            .filter_map(|p| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                match fs::read_to_string(&p) {
                    Ok(body) => Some((name, body)),
                    Err(err) => {
                        debug!(path = %p.display(), error = %err, "skipping reference");
                        None
                    }
                }
            })
            .collect()
    }
}
