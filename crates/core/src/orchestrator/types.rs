//! Types for the podcast orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::job::{JobStatus, JobStoreError};
use crate::remote::{MediaKind, RemoteError};

/// Errors returned synchronously by `submit`.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The topic failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// Every slot is taken and the admission policy rejects.
    #[error("at capacity: {active}/{capacity} generations running")]
    AtCapacity { active: usize, capacity: usize },

    /// The orchestrator was stopped and accepts no new jobs.
    #[error("orchestrator is stopped")]
    Stopped,

    /// Job store error.
    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),
}

/// Errors that end a generation. They are recorded on the job as `failed`.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The factory refused to create the remote job.
    #[error("failed to create {kind} job: {source}")]
    RemoteCreateFailed {
        kind: MediaKind,
        #[source]
        source: RemoteError,
    },

    /// The remote job did not finish within the poll budget.
    #[error("{kind} job {remote_job_id} timed out after {attempts} status checks")]
    RemotePollTimeout {
        kind: MediaKind,
        remote_job_id: String,
        attempts: u32,
    },

    /// The factory reported the remote job as failed.
    #[error("{kind} job failed: {message}")]
    RemoteJobFailed { kind: MediaKind, message: String },

    /// The factory does not know the remote job.
    #[error("{kind} job {remote_job_id} not found")]
    RemoteJobNotFound {
        kind: MediaKind,
        remote_job_id: String,
    },

    /// A completed remote job listed no usable location.
    #[error("no {kind} artifact in completed job")]
    ArtifactNotFound { kind: MediaKind },

    /// The orchestrator was stopped while the job was running.
    #[error("generation cancelled by shutdown")]
    Cancelled,

    /// Job store error.
    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),
}

impl GenerationError {
    /// Text stored in the job's `error_detail`.
    ///
    /// Remote failures carry the factory's own message unchanged.
    pub fn detail(&self) -> String {
        match self {
            GenerationError::RemoteJobFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            GenerationError::RemoteCreateFailed { .. } => "remote_create_failed",
            GenerationError::RemotePollTimeout { .. } => "poll_timeout",
            GenerationError::RemoteJobFailed { .. } => "remote_job_failed",
            GenerationError::RemoteJobNotFound { .. } => "remote_job_not_found",
            GenerationError::ArtifactNotFound { .. } => "artifact_not_found",
            GenerationError::Cancelled => "cancelled",
            GenerationError::Store(_) => "store",
        }
    }
}

/// What `submit` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub id: String,
    pub status: JobStatus,
    pub topic: String,
}

/// Result of the thumbnail sub-flow. It never carries an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// A generated image at this absolute location.
    Generated(String),
    /// Generation was skipped or failed; use the default placeholder.
    Placeholder,
}

impl ThumbnailOutcome {
    /// The location to record, falling back to `default`.
    pub fn into_location(self, default: &str) -> String {
        match self {
            ThumbnailOutcome::Generated(location) => location,
            ThumbnailOutcome::Placeholder => default.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ThumbnailOutcome::Placeholder)
    }
}

/// How a remote job is polled: wait `interval`, check, at most `max_attempts` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&GenerationConfig> for PollPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_failure_detail_is_verbatim() {
        let err = GenerationError::RemoteJobFailed {
            kind: MediaKind::Audio,
            message: "Voice model unavailable".to_string(),
        };
        assert_eq!(err.detail(), "Voice model unavailable");
        assert_eq!(err.to_string(), "audio job failed: Voice model unavailable");
    }

    #[test]
    fn test_timeout_detail_mentions_timeout() {
        let err = GenerationError::RemotePollTimeout {
            kind: MediaKind::Audio,
            remote_job_id: "job-1".to_string(),
            attempts: 48,
        };
        assert_eq!(
            err.detail(),
            "audio job job-1 timed out after 48 status checks"
        );
        assert_eq!(err.reason(), "poll_timeout");
    }

    #[test]
    fn test_thumbnail_outcome_location() {
        assert_eq!(
            ThumbnailOutcome::Generated("https://cdn/x.png".to_string()).into_location("/d.svg"),
            "https://cdn/x.png"
        );
        assert_eq!(ThumbnailOutcome::Placeholder.into_location("/d.svg"), "/d.svg");
    }

    #[test]
    fn test_poll_policy_from_default_config() {
        let policy = PollPolicy::from(&GenerationConfig::default());
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 48);
    }
}
