//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (outcomes, duration)
//! - Drops refused by validation
//! - Capability discovery

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Finished conversions by outcome.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dropconvert_conversions_total", "Total conversions by outcome"),
        &["outcome"], // "done", "execution_failure", "io_failure"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dropconvert_conversion_duration_seconds",
            "Duration of a conversion job",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Drops refused before a job started.
pub static DROPS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dropconvert_drops_rejected_total", "Drops refused by validation"),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Engine Metrics
// =============================================================================

/// Formats reported by the engine at startup.
pub static FORMATS_DISCOVERED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dropconvert_formats_discovered",
        "Number of formats listed by the engine",
    )
    .unwrap()
});

/// All core metrics, for registration by the host.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(DROPS_REJECTED.clone()),
        Box::new(FORMATS_DISCOVERED.clone()),
    ]
}
