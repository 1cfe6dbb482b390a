//! HTTP surface and background work for Herald.
//!
//! This crate provides:
//! - XSRF-protected list creation that queues invites
//! - The invite dispatcher that drains the queue within the code host's
//!   rate limit
//! - Health, rate-limited and metrics endpoints

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod xsrf;

pub use dispatcher::{InviteDispatcher, TickOutcome};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
