//! Prometheus metrics for wellness-service.
//!
//! Provides HTTP endpoint and model gateway metrics for observability.

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Endpoint metrics
pub static WELLNESS_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Gateway metrics
pub static GATEWAY_DISPATCH_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static STAGED_FILES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once, from any thread; the
/// registry and every metric handle are installed together by the first call.
pub fn init_metrics() {
    REGISTRY.get_or_init(build_registry);
}

fn build_registry() -> Registry {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("wellness_requests_total", "Total wellness endpoint requests"),
        &["endpoint", "status"],
    )
    .expect("Failed to create wellness_requests_total metric");

    let dispatch_total = IntCounterVec::new(
        Opts::new(
            "gateway_dispatch_total",
            "Total model gateway dispatches by outcome",
        ),
        &["outcome"], // success, staging, upload, generation
    )
    .expect("Failed to create gateway_dispatch_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "provider_latency_seconds",
            "Remote model call latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "operation"],
    )
    .expect("Failed to create provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("provider_errors_total", "Total remote model errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create provider_errors_total metric");

    let staged_files = IntCounter::new(
        "staged_files_total",
        "Attachments staged to disk for upload",
    )
    .expect("Failed to create staged_files_total metric");

    registry
        .register(Box::new(requests_total.clone()))
        .expect("Failed to register wellness_requests_total");
    registry
        .register(Box::new(dispatch_total.clone()))
        .expect("Failed to register gateway_dispatch_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register provider_errors_total");
    registry
        .register(Box::new(staged_files.clone()))
        .expect("Failed to register staged_files_total");

    // Only reached once, inside REGISTRY's initializer, so these never race.
    let _ = WELLNESS_REQUESTS_TOTAL.set(requests_total);
    let _ = GATEWAY_DISPATCH_TOTAL.set(dispatch_total);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = STAGED_FILES_TOTAL.set(staged_files);

    tracing::info!("Prometheus metrics initialized");
    registry
}

/// Render every registered metric in the Prometheus text exposition format.
pub fn get_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        tracing::error!("Metrics registry not initialized");
        return "# Metrics registry not initialized\n".to_string();
    };

    TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode metrics");
            format!("# Failed to encode metrics: {}\n", e)
        })
}

// Helper functions for recording metrics

/// Record a finished endpoint request.
pub fn record_request(endpoint: &str, status: &str) {
    if let Some(counter) = WELLNESS_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[endpoint, status]).inc();
    }
}

/// Record the outcome of one gateway dispatch.
pub fn record_dispatch(outcome: &str) {
    if let Some(counter) = GATEWAY_DISPATCH_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, operation: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, operation])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}

/// Count a staged attachment.
pub fn record_staged_file() {
    if let Some(counter) = STAGED_FILES_TOTAL.get() {
        counter.inc();
    }
}
