//! Error types for pith-ai

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Ways a completion request can fail
#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bad JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success status other than auth and rate limiting
    #[error("endpoint returned HTTP {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("endpoint rejected credentials: {0}")]
    Auth(String),

    #[error("no usable API key")]
    InvalidApiKey,

    /// The body parsed but is not a usable completion
    #[error("malformed completion: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Whether the same request could plausibly succeed later.
    /// Reported in logs; nothing retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
