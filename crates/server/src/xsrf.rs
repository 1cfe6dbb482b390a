//! Request forgery protection.
//!
//! A token is a timestamped signature over `action:session`, where the
//! session is the cache scope of the caller's code-host credential. Handlers
//! that mutate state call [`check`] before doing anything else.

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use axum::http::header::{HOST, REFERER};
use herald_signer::{SignatureStatus, SignerResult, TokenSigner};
use url::Url;

/// Header carrying the token on protected requests.
pub const XSRF_HEADER: &str = "x-xsrf-token";

fn message(action: &str, session: &str) -> String {
    format!("{action}:{session}")
}

/// Mint a token for `action` in `session`.
pub fn mint(signer: &TokenSigner, action: &str, session: &str) -> SignerResult<String> {
    signer.sign(&message(action, session))
}

/// Verify the request's token for `action` in `session`.
pub fn check(
    signer: &TokenSigner,
    headers: &HeaderMap,
    action: &str,
    session: &str,
    timeout_secs: i64,
) -> ApiResult<()> {
    check_referrer(headers)?;

    let token = headers
        .get(XSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden("missing xsrf token".to_string()))?;

    match signer.verify(&message(action, session), token, Some(timeout_secs)) {
        SignatureStatus::Ok => Ok(()),
        SignatureStatus::Timeout => Err(ApiError::XsrfExpired),
        SignatureStatus::Bad => {
            tracing::warn!(action = action, "Rejected request with invalid xsrf token");
            Err(ApiError::Forbidden("invalid xsrf token".to_string()))
        }
    }
}

/// The Referer must name the host the request was sent to. Ports are ignored.
fn check_referrer(headers: &HeaderMap) -> ApiResult<()> {
    let referer = headers
        .get(REFERER)
        .ok_or_else(|| ApiError::Forbidden("missing referer".to_string()))?;

    let referer = referer
        .to_str()
        .ok()
        .and_then(|r| Url::parse(r).ok())
        .ok_or_else(|| ApiError::Forbidden("malformed referer".to_string()))?;
    let referer_host = referer
        .host_str()
        .ok_or_else(|| ApiError::Forbidden("malformed referer".to_string()))?;
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden("missing host header".to_string()))?;

    if referer_host.eq_ignore_ascii_case(strip_port(host)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("cross-site referer".to_string()))
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        // Bracketed IPv6 literals keep their brackets; `Url::host_str` does too.
        Some((name, port)) if !port.contains(']') => name,
        _ => host,
    }
}
