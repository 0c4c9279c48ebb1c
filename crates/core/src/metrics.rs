//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (attempts, durations, superseded results)
//! - Artifacts (live handles, revocations)
//! - Retrieval (files written)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by strategy and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertfun_conversions_total", "Total file conversions"),
        &["source", "result"], // result: "done", "error"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "convertfun_conversion_duration_seconds",
            "Duration of file conversions",
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["strategy"], // "passthrough", "raster", "heic"
    )
    .unwrap()
});

/// Attempts whose result was discarded because a newer attempt started.
pub static SUPERSEDED_ATTEMPTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "convertfun_superseded_attempts_total",
        "Total conversion attempts superseded before completion",
    )
    .unwrap()
});

// =============================================================================
// Artifact Metrics
// =============================================================================

/// Artifacts currently live.
pub static ARTIFACTS_LIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("convertfun_artifacts_live", "Artifacts currently live").unwrap()
});

/// Artifacts revoked total.
pub static ARTIFACTS_REVOKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "convertfun_artifacts_revoked_total",
        "Total artifacts revoked",
    )
    .unwrap()
});

// =============================================================================
// Retrieval Metrics
// =============================================================================

/// Retrievals total by result.
pub static RETRIEVALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("convertfun_retrievals_total", "Total artifact retrievals"),
        &["result"], // "success", "failed", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(SUPERSEDED_ATTEMPTS.clone()),
        // Artifacts
        Box::new(ARTIFACTS_LIVE.clone()),
        Box::new(ARTIFACTS_REVOKED.clone()),
        // Retrieval
        Box::new(RETRIEVALS_TOTAL.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CONVERSIONS_TOTAL.with_label_values(&["PNG", "done"]).inc();
        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"convertfun_conversions_total".to_string()));
    }
}
