//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the dropconvert server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Converter status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use dropconvert_core::ConversionStatus;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dropconvert_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dropconvert_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dropconvert_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dropconvert_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dropconvert_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// Status snapshots pushed to WebSocket clients.
pub static WS_SNAPSHOTS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dropconvert_ws_snapshots_sent_total",
        "Status snapshots sent over WebSocket",
    )
    .unwrap()
});

// =============================================================================
// Converter Metrics (collected dynamically)
// =============================================================================

/// 1 for the converter's current status, 0 for the others.
pub static CONVERTER_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("dropconvert_converter_status", "Current converter status"),
        &["status"],
    )
    .unwrap()
});

/// Progress of the running conversion (0-100).
pub static CONVERTER_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dropconvert_converter_progress_percent",
        "Progress of the current conversion",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_SNAPSHOTS_SENT.clone()))
        .unwrap();

    // Converter
    registry
        .register(Box::new(CONVERTER_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(CONVERTER_PROGRESS.clone()))
        .unwrap();

    // Core metrics (conversions, rejections, formats)
    for metric in dropconvert_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the converter gauges reflect the latest snapshot.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let snapshot = state.orchestrator().snapshot();

    for status in [
        ConversionStatus::Loading,
        ConversionStatus::Loaded,
        ConversionStatus::Converting,
        ConversionStatus::Done,
        ConversionStatus::Failed,
    ] {
        let value = if status == snapshot.status { 1 } else { 0 };
        CONVERTER_STATUS
            .with_label_values(&[status.as_str()])
            .set(value);
    }
    CONVERTER_PROGRESS.set(snapshot.progress_percent.round() as i64);
}

/// Normalize a path for metric labels.
///
/// API paths are kept as is; everything else is a static asset and collapses
/// into one label.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with("/api/") {
        path.trim_end_matches('/').to_string()
    } else {
        "{static}".to_string()
    }
}
