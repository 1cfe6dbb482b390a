//! Route configuration.

use crate::error::RATE_LIMITED_PATH;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health check (unauthenticated for load balancers)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/xsrf", get(handlers::get_xsrf_token))
        .route("/v1/lists", post(handlers::create_list))
        .route("/v1/auth/callback", get(handlers::auth_callback))
        .route(RATE_LIMITED_PATH, get(handlers::rate_limited));

    // SECURITY: when enabled, this endpoint must be network-restricted to the
    // Prometheus scraper.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
