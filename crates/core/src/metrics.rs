//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job submission and admission
//! - Generation outcomes and duration
//! - Remote factory polling

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Submission Metrics
// =============================================================================

/// Jobs accepted by `submit`, by initial status.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("podcaster_jobs_submitted_total", "Total jobs accepted"),
        &["initial_status"], // "processing", "queued"
    )
    .unwrap()
});

/// Jobs refused because the limiter was saturated.
pub static JOBS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podcaster_jobs_rejected_total",
        "Total jobs rejected at capacity",
    )
    .unwrap()
});

// =============================================================================
// Generation Metrics
// =============================================================================

/// Jobs completed total.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podcaster_jobs_completed_total",
        "Total jobs completed successfully",
    )
    .unwrap()
});

/// Jobs failed total by reason.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("podcaster_jobs_failed_total", "Total jobs failed"),
        &["reason"],
    )
    .unwrap()
});

/// Time from admission to a terminal record.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "podcaster_generation_duration_seconds",
            "Duration of a generation from admission to terminal state",
        )
        .buckets(vec![5.0, 10.0, 30.0, 60.0, 90.0, 120.0, 180.0, 240.0, 300.0]),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Jobs completed with the placeholder thumbnail.
pub static THUMBNAIL_PLACEHOLDERS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podcaster_thumbnail_placeholders_total",
        "Total completed jobs that fell back to the default thumbnail",
    )
    .unwrap()
});

// =============================================================================
// Remote Factory Metrics
// =============================================================================

/// Status checks against the factory.
pub static POLL_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "podcaster_poll_attempts_total",
            "Total remote job status checks",
        ),
        &["kind", "outcome"], // outcome: "pending", "completed", "failed", "error"
    )
    .unwrap()
});

/// Remote job creation requests.
pub static REMOTE_CREATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "podcaster_remote_creates_total",
            "Total remote job creation requests",
        ),
        &["kind", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Submission
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_REJECTED.clone()),
        // Generation
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(GENERATION_DURATION.clone()),
        Box::new(THUMBNAIL_PLACEHOLDERS.clone()),
        // Remote factory
        Box::new(POLL_ATTEMPTS.clone()),
        Box::new(REMOTE_CREATES.clone()),
    ]
}
