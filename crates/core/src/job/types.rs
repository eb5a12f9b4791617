//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a podcast job.
///
/// `queued -> processing -> completed | failed`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title shown for a finished podcast.
pub fn display_title(topic: &str) -> String {
    format!("60 seconds on: {}", topic)
}

/// Summary shown for a finished podcast.
pub fn display_summary(topic: &str) -> String {
    format!("An AI-generated podcast on \"{}\".", topic)
}

/// A podcast generation job.
///
/// Records are replaced as a whole on every update; see [`crate::job::JobStore::put`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_audio_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_thumbnail_job_id: Option<String>,
    /// Absolute location of the generated audio, set only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_artifact_location: Option<String>,
    /// Generated image location, or the placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_artifact_location: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Job {
    /// New job with a fresh id. `status` is `Queued` or `Processing`.
    pub fn new(topic: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            topic: topic.into(),
            title: None,
            summary: None,
            remote_audio_job_id: None,
            remote_thumbnail_job_id: None,
            audio_artifact_location: None,
            thumbnail_artifact_location: None,
            created_at: Utc::now(),
            completed_at: None,
            error_detail: None,
        }
    }

    /// The record after the limiter admitted the job.
    pub fn into_processing(mut self) -> Self {
        self.status = JobStatus::Processing;
        self
    }

    /// The final successful record.
    pub fn into_completed(
        mut self,
        audio_location: String,
        thumbnail_location: String,
        completed_at: DateTime<Utc>,
    ) -> Self {
        self.status = JobStatus::Completed;
        self.title = Some(display_title(&self.topic));
        self.summary = Some(display_summary(&self.topic));
        self.audio_artifact_location = Some(audio_location);
        self.thumbnail_artifact_location = Some(thumbnail_location);
        self.completed_at = Some(completed_at);
        self.error_detail = None;
        self
    }

    /// The final failed record.
    pub fn into_failed(mut self, detail: impl Into<String>, failed_at: DateTime<Utc>) -> Self {
        self.status = JobStatus::Failed;
        self.error_detail = Some(detail.into());
        self.completed_at = Some(failed_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job() {
        let job = Job::new("Black holes", JobStatus::Queued);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.topic, "Black holes");
        assert!(Uuid::parse_str(&job.id).is_ok());
        assert!(job.remote_audio_job_id.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Job::new("x", JobStatus::Processing);
        let b = Job::new("x", JobStatus::Processing);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_into_completed_sets_display_fields() {
        let now = Utc::now();
        let job = Job::new("CRISPR", JobStatus::Queued)
            .into_processing()
            .into_completed(
                "https://factory.example.com/files/a.wav".to_string(),
                "/thumbnails/default.svg".to_string(),
                now,
            );

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.title.as_deref(), Some("60 seconds on: CRISPR"));
        assert_eq!(
            job.summary.as_deref(),
            Some("An AI-generated podcast on \"CRISPR\".")
        );
        assert_eq!(job.completed_at, Some(now));
        assert_eq!(
            job.thumbnail_artifact_location.as_deref(),
            Some("/thumbnails/default.svg")
        );
    }

    #[test]
    fn test_into_failed_keeps_remote_ids() {
        let mut job = Job::new("Quantum computing", JobStatus::Processing);
        job.remote_audio_job_id = Some("vp-1".to_string());
        let job = job.into_failed("Synthesis crashed", Utc::now());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_detail.as_deref(), Some("Synthesis crashed"));
        assert_eq!(job.remote_audio_job_id.as_deref(), Some("vp-1"));
        assert!(job.audio_artifact_location.is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let status: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, JobStatus::Failed);
    }

    #[test]
    fn test_job_serialization_skips_empty_fields() {
        let job = Job::new("Blockchain", JobStatus::Queued);
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "queued");
        assert!(value.get("error_detail").is_none());
        assert!(value.get("audio_artifact_location").is_none());
    }
}
