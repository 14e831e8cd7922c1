//! What the controller asks the oracle for next.

use serde::{Deserialize, Serialize};

/// One oracle request, carrying exactly the artifacts its strategy needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OracleRequest {
    /// Open-ended first generation.
    Initial,
    /// Prior source plus the toolchain diagnostic.
    FixCompile { source: String, diagnostic: String },
    /// Prior source that ran past the deadline.
    FixTimeout { source: String },
    /// Prior source plus the score it reached.
    Improve { source: String, score: f64 },
}

/// Request kind without its payload, for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Initial,
    FixCompile,
    FixTimeout,
    Improve,
}

impl OracleRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            OracleRequest::Initial => RequestKind::Initial,
            OracleRequest::FixCompile { .. } => RequestKind::FixCompile,
            OracleRequest::FixTimeout { .. } => RequestKind::FixTimeout,
            OracleRequest::Improve { .. } => RequestKind::Improve,
        }
    }
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Initial => "initial",
            RequestKind::FixCompile => "fix_compile",
            RequestKind::FixTimeout => "fix_timeout",
            RequestKind::Improve => "improve",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
