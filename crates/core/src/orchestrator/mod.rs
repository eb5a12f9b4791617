//! Podcast job orchestrator.
//!
//! Drives a job from submission to a terminal record:
//! - **Admission**: every generation runs under the shared [`AdmissionLimiter`](crate::limiter::AdmissionLimiter)
//! - **Audio**: mandatory; any failure fails the job
//! - **Thumbnail**: best effort; any failure resolves to the placeholder

mod artifact;
mod poller;
mod runner;
mod types;

pub use artifact::{extract_artifact, resolve_location};
pub use poller::poll_remote_job;
pub use runner::{PodcastOrchestrator, MAX_TOPIC_CHARS};
pub use types::{GenerationError, PollPolicy, SubmitError, SubmitReceipt, ThumbnailOutcome};
