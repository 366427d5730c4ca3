//! Prometheus metrics for the Critique server.
//!
//! Counters cover review lifecycle, engagement and account activity.
//! The `/metrics` endpoint is unauthenticated to allow scraping and should be
//! network-restricted at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Review lifecycle
pub static REVIEWS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("critique_reviews_created_total", "Total number of reviews created")
        .expect("metric creation failed")
});

pub static REVIEWS_UPDATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("critique_reviews_updated_total", "Total number of review updates")
        .expect("metric creation failed")
});

pub static REVIEWS_SOFT_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "critique_reviews_soft_deleted_total",
        "Total number of reviews soft-deleted",
    )
    .expect("metric creation failed")
});

pub static REVIEWS_RESTORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "critique_reviews_restored_total",
        "Total number of soft-deleted reviews restored",
    )
    .expect("metric creation failed")
});

// Engagement
pub static LIKES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("critique_likes_total", "Like requests by outcome"),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static DISLIKES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("critique_dislikes_total", "Total number of dislike requests")
        .expect("metric creation failed")
});

// Accounts
pub static SIGNUPS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("critique_signups_total", "Total number of accounts created")
        .expect("metric creation failed")
});

pub static LOGINS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("critique_logins_total", "Total number of successful logins")
        .expect("metric creation failed")
});

pub static AUTH_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "critique_auth_failures_total",
            "Rejected logins and bearer tokens by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so integration tests can build many routers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REVIEWS_CREATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REVIEWS_UPDATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REVIEWS_SOFT_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(REVIEWS_RESTORED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LIKES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DISLIKES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SIGNUPS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LOGINS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AUTH_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
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

/// Record a like request outcome (`liked` or `already_acted`).
pub fn record_like(outcome: &str) {
    LIKES.with_label_values(&[outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        register_metrics();
        register_metrics();
        record_like("liked");
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&REGISTRY.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("critique_likes_total"));
    }
}
