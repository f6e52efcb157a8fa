// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Namesilo ingress DNS controller.
//!
//! All metrics carry the namespace prefix `kube_namesilo_dns_`.
//!
//! # Metrics Categories
//!
//! - **Record Metrics** - Provider-side records added, updated, and deleted
//! - **Ingress Event Metrics** - Events consumed and how they were resolved
//! - **Cache Metrics** - Refreshes by trigger and outcome, cached record count
//! - **Error Metrics** - Errors by category
//! - **Leader Election Metrics** - Leadership state changes
//!
//! # Example
//!
//! ```rust,no_run
//! use kube_namesilo_dns::metrics::{gather_metrics, record_dns_record_added};
//!
//! record_dns_record_added("CNAME");
//! let text = gather_metrics().unwrap();
//! ```

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all controller metrics
const METRICS_NAMESPACE: &str = "kube_namesilo_dns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Record Metrics
// ============================================================================

/// Total number of records created at the provider
///
/// Labels:
/// - `record_type`: `A` or `CNAME`
pub static RECORDS_ADDED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_added_total"),
        "Total number of DNS records created by type",
    );
    let counter = CounterVec::new(opts, &["record_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of records updated at the provider
///
/// Labels:
/// - `record_type`: `A` or `CNAME`
pub static RECORDS_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_updated_total"),
        "Total number of DNS records updated by type",
    );
    let counter = CounterVec::new(opts, &["record_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of records deleted at the provider
///
/// Labels:
/// - `record_type`: `A` or `CNAME`
pub static RECORDS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_deleted_total"),
        "Total number of DNS records deleted by type",
    );
    let counter = CounterVec::new(opts, &["record_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Ingress Event Metrics
// ============================================================================

/// Total number of ingress events handled
///
/// Labels:
/// - `event`: `exists` or `deleted`
/// - `outcome`: `skipped`, `noop`, `added`, `updated`, `deleted`, `error`
pub static INGRESS_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_ingress_events_total"),
        "Total number of ingress events by kind and outcome",
    );
    let counter = CounterVec::new(opts, &["event", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Cache Metrics
// ============================================================================

/// Total number of cache refreshes
///
/// Labels:
/// - `trigger`: `startup`, `periodic`, `mutation`, `sync`
/// - `status`: `success` or `error`
pub static CACHE_REFRESHES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_cache_refreshes_total"),
        "Total number of cache refreshes by trigger and status",
    );
    let counter = CounterVec::new(opts, &["trigger", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of cache refreshes in seconds, both network calls included
pub static CACHE_REFRESH_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_cache_refresh_duration_seconds"),
        "Duration of cache refreshes in seconds by trigger",
    )
    .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["trigger"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Number of provider records held by the cache after the last successful refresh
pub static CACHED_RECORDS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_cached_records"),
        "Number of provider records in the cache",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by category
///
/// Labels:
/// - `error_type`: Category from `DnsError::error_type`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by type",
    );
    let counter = CounterVec::new(opts, &["error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Leader Election Metrics
// ============================================================================

/// Total number of leader election events
///
/// Labels:
/// - `status`: Event type (`acquired`, `lost`)
pub static LEADER_ELECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_elections_total"),
        "Total number of leader election events by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Current leader election status
///
/// Labels:
/// - `pod_name`: Name of the pod
///
/// Value: 1 if leader, 0 if follower
pub static LEADER_STATUS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Current leader election status (1 = leader, 0 = follower)",
    );
    let gauge = GaugeVec::new(opts, &["pod_name"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a record created at the provider
pub fn record_dns_record_added(record_type: &str) {
    RECORDS_ADDED_TOTAL.with_label_values(&[record_type]).inc();
}

/// Record a record updated at the provider
pub fn record_dns_record_updated(record_type: &str) {
    RECORDS_UPDATED_TOTAL.with_label_values(&[record_type]).inc();
}

/// Record a record deleted at the provider
pub fn record_dns_record_deleted(record_type: &str) {
    RECORDS_DELETED_TOTAL.with_label_values(&[record_type]).inc();
}

/// Record one handled ingress event
///
/// # Arguments
/// * `event` - `exists` or `deleted`
/// * `outcome` - How the event was resolved
pub fn record_ingress_event(event: &str, outcome: &str) {
    INGRESS_EVENTS_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

/// Record a successful cache refresh
///
/// # Arguments
/// * `trigger` - What caused the refresh
/// * `record_count` - Records held after the refresh
/// * `duration` - Time spent holding the cache lock
pub fn record_cache_refresh_success(trigger: &str, record_count: usize, duration: Duration) {
    CACHE_REFRESHES_TOTAL
        .with_label_values(&[trigger, "success"])
        .inc();
    CACHE_REFRESH_DURATION_SECONDS
        .with_label_values(&[trigger])
        .observe(duration.as_secs_f64());
    #[allow(clippy::cast_precision_loss)]
    let count = record_count as f64;
    CACHED_RECORDS.set(count);
}

/// Record a failed cache refresh
pub fn record_cache_refresh_error(trigger: &str, duration: Duration) {
    CACHE_REFRESHES_TOTAL
        .with_label_values(&[trigger, "error"])
        .inc();
    CACHE_REFRESH_DURATION_SECONDS
        .with_label_values(&[trigger])
        .observe(duration.as_secs_f64());
}

/// Record an error
///
/// # Arguments
/// * `error_type` - Category of error (e.g., `ProviderError`, `RecordNotFound`)
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Record leader election acquired
///
/// # Arguments
/// * `pod_name` - Name of the pod that acquired leadership
pub fn record_leader_elected(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL
        .with_label_values(&["acquired"])
        .inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(1.0);
}

/// Record leader election lost
///
/// # Arguments
/// * `pod_name` - Name of the pod that lost leadership
pub fn record_leader_lost(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL.with_label_values(&["lost"]).inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(0.0);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoint
// ============================================================================

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Router serving `/metrics` and `/healthz`.
pub fn metrics_router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(health_handler))
}

/// Serve [`metrics_router`] on `bind_address` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(
    bind_address: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(%bind_address, "Metrics server listening");

    axum::serve(listener, metrics_router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
