//! Job storage trait and types.

use thiserror::Error;

use super::{Job, JobStatus};

/// Error type for job store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobStoreError {
    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// A job with this id already exists.
    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    /// The stored record is terminal and cannot be replaced.
    #[error("Cannot update job {job_id}: already {status}")]
    TerminalState { job_id: String, status: JobStatus },

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Trait for job storage backends.
///
/// Updates are full-record replace writes: callers read a job, build the
/// next version, and `put` it back. Nothing serializes two writers of the
/// same job against each other, so concurrent updates to one record must be
/// avoided by the caller.
pub trait JobStore: Send + Sync {
    /// Insert a new job.
    fn create(&self, job: Job) -> Result<Job, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError>;

    /// Replace an existing job record. Terminal records are never replaced.
    fn put(&self, job: Job) -> Result<Job, JobStoreError>;

    /// Total number of jobs.
    fn count(&self) -> Result<usize, JobStoreError>;

    /// Number of jobs in the given status.
    fn count_by_status(&self, status: JobStatus) -> Result<usize, JobStoreError>;
}
