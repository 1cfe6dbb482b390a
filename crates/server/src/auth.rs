//! Request credential extraction.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

/// Extract the code-host bearer token from the Authorization header.
/// Per RFC 6750, the "Bearer" scheme is case-insensitive.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|token| !token.is_empty())
}

/// Require a code-host bearer token.
pub fn require_bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("missing code host token".to_string()))
}
