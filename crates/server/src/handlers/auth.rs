//! OAuth callback from the list service.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: String,
    /// Page the user started from.
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthCallbackResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Where to send the user next; always a local path.
    pub next: String,
}

/// GET /v1/auth/callback?code=...&state=...
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<AuthCallbackQuery>,
) -> ApiResult<Json<AuthCallbackResponse>> {
    if query.code.trim().is_empty() {
        return Err(ApiError::BadRequest("missing authorization code".to_string()));
    }

    let token = state.groups.exchange_code(&query.code).await?;
    tracing::info!("Completed list service authorization");

    Ok(Json(AuthCallbackResponse {
        access_token: token.access_token,
        token_type: token.token_type,
        next: local_path(query.state.as_deref()),
    }))
}

/// `next` if it names a path on this host, `/` otherwise.
fn local_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}
