//! Prometheus metrics for the Herald server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! It exposes aggregate queue and upstream activity only, but should still be
//! network-restricted to the scraper.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use herald_client::Signal;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Queue metrics
pub static INVITES_ENQUEUED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "herald_invites_enqueued_total",
        "Total number of invites added to the queue",
    )
    .expect("metric creation failed")
});

pub static INVITES_DEQUEUED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "herald_invites_dequeued_total",
        "Total number of invites claimed by the dispatcher",
    )
    .expect("metric creation failed")
});

// Delivery metrics
pub static INVITES_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "herald_invites_sent_total",
        "Total number of invites handed to the list service",
    )
    .expect("metric creation failed")
});

pub static INVITES_SKIPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "herald_invites_skipped_total",
        "Total number of invites dropped because the invitee has no public email",
    )
    .expect("metric creation failed")
});

pub static INVITES_FAILED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "herald_invites_failed_total",
            "Total number of invites that could not be delivered, by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

// Upstream metrics
pub static UPSTREAM_SIGNALS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "herald_upstream_signals_total",
            "Recoverable upstream conditions observed, by kind",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
/// Safe to call more than once.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(INVITES_ENQUEUED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INVITES_DEQUEUED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INVITES_SENT.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INVITES_SKIPPED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INVITES_FAILED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_SIGNALS.clone()))
            .expect("metric registration failed");
    });
}

/// Metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record an invite that could not be delivered.
pub fn record_invite_failure(reason: &str) {
    INVITES_FAILED.with_label_values(&[reason]).inc();
}

/// Record a recoverable upstream signal.
pub fn record_signal(signal: Signal) {
    UPSTREAM_SIGNALS.with_label_values(&[signal.as_str()]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Panics if any metric creation failed
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_record_signal_labels() {
        let before = UPSTREAM_SIGNALS
            .with_label_values(&["rate_limited"])
            .get();
        record_signal(Signal::RateLimited);
        assert!(
            UPSTREAM_SIGNALS
                .with_label_values(&["rate_limited"])
                .get()
                > before
        );
    }
}
