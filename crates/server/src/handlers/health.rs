//! Health and status endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use herald_metadata::repos::InviteQueueRepo;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Invites waiting for the dispatcher.
    pub pending_invites: u64,
}

/// GET /v1/health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;
    let pending_invites = state.metadata.count_pending_invites().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        pending_invites,
    }))
}

/// Body of the rate-limited page.
#[derive(Debug, Serialize)]
pub struct RateLimitedResponse {
    pub code: &'static str,
    pub message: &'static str,
}

/// GET /rate_limited
///
/// Target of the redirect sent with every rate-limited response.
pub async fn rate_limited() -> Json<RateLimitedResponse> {
    Json(RateLimitedResponse {
        code: ApiError::RateLimited.code(),
        message: "The code host's API limit for this service has been reached. \
                  Please try again in a few minutes.",
    })
}
