//! API error types.

use crate::metrics;
use axum::Json;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use herald_client::ClientError;
use serde::Serialize;

/// Page users are sent to when the code host's budget is exhausted.
pub const RATE_LIMITED_PATH: &str = "/rate_limited";

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("xsrf token expired")]
    XsrfExpired,

    #[error("code host authorization expired; sign in again")]
    Reauthorize,

    #[error("code host rate limit reached; try again later")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] herald_metadata::MetadataError),

    #[error("core error: {0}")]
    Core(#[from] herald_core::Error),

    #[error("signer error: {0}")]
    Signer(#[from] herald_signer::SignerError),
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        if let Some(signal) = err.signal() {
            metrics::record_signal(signal);
        }
        match err {
            ClientError::Reauthorize => Self::Reauthorize,
            ClientError::RateLimited => Self::RateLimited,
            ClientError::Cache(e) => Self::Metadata(e),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::XsrfExpired => "xsrf_expired",
            Self::Reauthorize => "reauthorize",
            Self::RateLimited => "rate_limited",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
            Self::Metadata(_) => "metadata_error",
            Self::Core(_) => "core_error",
            Self::Signer(_) => "signer_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::XsrfExpired => StatusCode::FORBIDDEN,
            Self::Reauthorize => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                herald_metadata::MetadataError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
            Self::Signer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        });
        match self {
            Self::RateLimited => (status, [(LOCATION, RATE_LIMITED_PATH)], body).into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_map_to_statuses() {
        let err = ApiError::from(ClientError::Reauthorize);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "reauthorize");

        let err = ApiError::from(ClientError::RateLimited);
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let err = ApiError::from(ClientError::Api("Not Found".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_metadata_errors_map_to_statuses() {
        use herald_metadata::MetadataError;

        let invalid = herald_core::Error::InvalidInvite("invitee is empty".to_string());
        let err = ApiError::from(MetadataError::Invalid(invalid));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(MetadataError::Internal("pool closed".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_response_redirects() {
        let response = ApiError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            RATE_LIMITED_PATH
        );
    }
}
