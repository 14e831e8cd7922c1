//! Error types for oracle calls.

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("oracle returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),

    #[error("oracle reply contained no ```cpp code block")]
    NoCodeBlock,

    #[error("scripted oracle exhausted after {0} replies")]
    Exhausted(usize),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Http(err.to_string())
    }
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;
