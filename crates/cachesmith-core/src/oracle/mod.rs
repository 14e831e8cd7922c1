//! Oracle collaborator: turns prompt text into candidate source.
//!
//! # Modules
//!
//! - [`request`]: `OracleRequest` (initial / fix-compile / fix-timeout / improve)
//! - [`prompts`]: `PromptBuilder`
//! - [`extract`]: fenced ```` ```cpp ```` block extraction
//! - [`chat`]   : `ChatOracle`, an OpenAI-compatible client
//! - [`fakes`]  : `ScriptedOracle`

pub mod chat;
pub mod error;
pub mod extract;
pub mod fakes;
pub mod prompts;
pub mod request;

use async_trait::async_trait;

pub use chat::{ChatOracle, OracleConfig};
pub use error::{OracleError, OracleResult};
pub use extract::{extract_cpp_blocks, first_cpp_block};
pub use fakes::ScriptedOracle;
pub use prompts::PromptBuilder;
pub use request::{OracleRequest, RequestKind};

/// The generative collaborator: `generate(prompt_text) → source_text`.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> OracleResult<String>;
}
