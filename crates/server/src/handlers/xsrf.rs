//! XSRF token minting.

use crate::auth::require_bearer_token;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct XsrfQuery {
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct XsrfResponse {
    pub action: String,
    pub token: String,
    /// Seconds the token stays valid.
    pub expires_in: i64,
}

/// GET /v1/xsrf?action=...
pub async fn get_xsrf_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<XsrfQuery>,
) -> ApiResult<Json<XsrfResponse>> {
    let token = require_bearer_token(&headers)?;
    let session = state.signer.cache_scope(token);
    let xsrf = crate::xsrf::mint(&state.signer, &query.action, &session)?;

    Ok(Json(XsrfResponse {
        action: query.action,
        token: xsrf,
        expires_in: state.config.server.xsrf_timeout(),
    }))
}
