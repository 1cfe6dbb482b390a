//! Client error types.

use herald_metadata::MetadataError;
use thiserror::Error;

/// Recoverable conditions reported by an upstream service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The credential expired or was revoked; the caller should drop it and
    /// send the user back through authorization.
    Reauthorize,
    /// The upstream call budget is exhausted; retry later.
    RateLimited,
}

impl Signal {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Reauthorize => "reauthorize",
            Signal::RateLimited => "rate_limited",
        }
    }
}

/// Errors returned by the upstream clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("upstream credential expired or was revoked")]
    Reauthorize,

    #[error("upstream rate limit exceeded")]
    RateLimited,

    #[error("upstream API error: {0}")]
    Api(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response cache error: {0}")]
    Cache(#[from] MetadataError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The recoverable signal this error carries, if any.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            ClientError::Reauthorize => Some(Signal::Reauthorize),
            ClientError::RateLimited => Some(Signal::RateLimited),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
