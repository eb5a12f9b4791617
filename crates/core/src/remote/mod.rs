//! Remote generation factory integration.
//!
//! The factory runs long generation jobs: a job is created, then its status
//! is polled until it reports `completed` or `failed`, at which point the
//! payload lists where the produced artifacts can be fetched.

mod factory;
mod types;

pub use factory::FactoryClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to a remote factory.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Artifact location is not an absolute URL.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
}

/// A remote job factory.
#[async_trait]
pub trait RemoteJobApi: Send + Sync {
    /// Job collection URL. Relative artifact locations resolve against its origin.
    fn base_url(&self) -> &str;

    /// Create a remote job and return its id.
    async fn create(&self, request: &RemoteJobRequest) -> Result<String, RemoteError>;

    /// Current status of a remote job.
    async fn get_status(&self, remote_job_id: &str) -> Result<RemoteJobResult, RemoteError>;

    /// Download an artifact with factory credentials.
    async fn fetch_artifact(&self, location: &str) -> Result<ArtifactPayload, RemoteError>;
}
