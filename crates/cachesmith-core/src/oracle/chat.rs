//! OpenAI-compatible chat-completions oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::error::{OracleError, OracleResult};
use super::extract::first_cpp_block;
use super::Oracle;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_PROMPT: &str = "You are a helpful C++ coding assistant.";

/// Connection and sampling settings for [`ChatOracle`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleConfig {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            max_tokens: 10_000,
            temperature: 0.7,
            request_timeout_secs: 300,
        }
    }
}

impl OracleConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Oracle backed by a `/chat/completions` endpoint.
///
/// The reply's first ```` ```cpp ```` block is the candidate source.
pub struct ChatOracle {
    config: OracleConfig,
    api_key: String,
    http_client: Client,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> OracleResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(OracleError::MissingApiKey)?;
        let http_client = Client::builder()
            .user_agent(concat!("cachesmith/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    /// Raw reply text for `prompt`.
    pub async fn complete(&self, prompt: &str) -> OracleResult<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .http_client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status,
                body: truncate(&body, 320),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::InvalidResponse("no message content".to_string()))
    }

    /// `GET /models` with the configured key; `Ok(())` when it is accepted.
    pub async fn validate_api_key(&self) -> OracleResult<()> {
        let response = self
            .http_client
            .get(self.config.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status().is_success() {
            info!(model = %self.config.model, "API key validated");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(OracleError::Status {
                status,
                body: truncate(&body, 320),
            })
        }
    }
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        debug!(prompt = %prompt, "oracle prompt");
        let reply = self.complete(prompt).await?;
        debug!(reply = %reply, "oracle reply");
        first_cpp_block(&reply).ok_or(OracleError::NoCodeBlock)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
