//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the podcaster server:
//! - HTTP request metrics (latency, counts, errors)
//! - Artifact proxy traffic
//! - Limiter and job status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::error;

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
            "podcaster_http_request_duration_seconds",
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
        Opts::new("podcaster_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "podcaster_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Artifact Proxy Metrics
// =============================================================================

/// Artifact proxy requests by kind and outcome.
pub static ARTIFACT_PROXY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "podcaster_artifact_proxy_requests_total",
            "Artifact proxy requests",
        ),
        &["kind", "outcome"], // outcome: "streamed", "redirected", "error"
    )
    .unwrap()
});

// =============================================================================
// Limiter and Job Metrics
// =============================================================================

/// Configured limiter capacity.
pub static LIMITER_CAPACITY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "podcaster_limiter_capacity",
        "Maximum concurrent generations",
    )
    .unwrap()
});

/// Generations currently holding a slot.
pub static LIMITER_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("podcaster_limiter_active", "Generations currently running").unwrap()
});

/// Generations waiting for a slot.
pub static LIMITER_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "podcaster_limiter_queued",
        "Generations waiting for a slot",
    )
    .unwrap()
});

/// Jobs by current status (collected dynamically).
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("podcaster_jobs_by_status", "Current job count by status"),
        &["status"],
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

    // Artifacts
    registry
        .register(Box::new(ARTIFACT_PROXY_REQUESTS.clone()))
        .unwrap();

    // Limiter and jobs
    registry
        .register(Box::new(LIMITER_CAPACITY.clone()))
        .unwrap();
    registry.register(Box::new(LIMITER_ACTIVE.clone())).unwrap();
    registry.register(Box::new(LIMITER_QUEUED.clone())).unwrap();
    registry.register(Box::new(JOBS_BY_STATUS.clone())).unwrap();

    // Core metrics (submission, generation, remote factory)
    for metric in podcaster_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the limiter and the job store.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let orchestrator = state.orchestrator();

    let stats = orchestrator.limiter_stats();
    LIMITER_CAPACITY.set(stats.capacity as i64);
    LIMITER_ACTIVE.set(stats.active_count as i64);
    LIMITER_QUEUED.set(stats.queued_count as i64);

    match orchestrator.job_counts() {
        Ok(counts) => {
            for (status, count) in counts {
                JOBS_BY_STATUS
                    .with_label_values(&[status.as_str()])
                    .set(count as i64);
            }
        }
        Err(e) => error!("Failed to count jobs for metrics: {}", e),
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static ARTIFACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/api/v1/(?:audio|thumbnail))/.+$").unwrap());

/// Normalize a path for metric labels (replace IDs and artifact locations with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = ARTIFACT_RE.replace(path, "$1/{location}");
    let result = UUID_RE.replace_all(&result, "{id}");
    result.to_string()
}
