//! Mock remote factory for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::remote::{
    ArtifactPayload, RemoteArtifact, RemoteError, RemoteJobApi, RemoteJobRequest, RemoteJobResult,
};

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Report the job as still running.
    Pending,
    /// Report the job as completed with this payload.
    Complete(RemoteJobResult),
    /// Report the job as failed with this message.
    Fail(String),
    /// Fail the status request itself with this HTTP status.
    HttpError(u16),
    /// Answer 404.
    NotFound,
}

impl ScriptStep {
    /// Completed with one typed artifact.
    pub fn complete_with(kind: &str, location: &str) -> Self {
        ScriptStep::Complete(RemoteJobResult::completed(
            vec![RemoteArtifact::typed(kind, location)],
            vec![],
        ))
    }

    fn into_result(self, remote_job_id: &str) -> Result<RemoteJobResult, RemoteError> {
        match self {
            ScriptStep::Pending => Ok(RemoteJobResult::in_progress("running")),
            ScriptStep::Complete(result) => Ok(result),
            ScriptStep::Fail(message) => Ok(RemoteJobResult::failed(&message)),
            ScriptStep::HttpError(status) => Err(RemoteError::Api {
                status,
                message: "scripted error".to_string(),
            }),
            ScriptStep::NotFound => Err(RemoteError::NotFound(remote_job_id.to_string())),
        }
    }
}

#[derive(Default)]
struct MockState {
    /// Scripts for specific remote job ids.
    scripts: HashMap<String, VecDeque<ScriptStep>>,
    /// Script handed to every job created without a specific one.
    default_script: Vec<ScriptStep>,
    /// If set, every create fails with this error message.
    create_error: Option<String>,
    /// If set, every create call takes this long to answer.
    create_delay: Option<Duration>,
    /// Recorded create requests, in call order.
    requests: Vec<RemoteJobRequest>,
    /// Status checks per remote job id.
    status_calls: HashMap<String, usize>,
    /// Artifacts served by `fetch_artifact`.
    artifacts: HashMap<String, ArtifactPayload>,
}

/// Mock implementation of the RemoteJobApi trait.
///
/// Provides controllable behavior for testing:
/// - Scripted status sequences per remote job (or for every job)
/// - Creation failures
/// - Recorded create requests and status check counts
///
/// Once a script is exhausted the job keeps reporting "running".
///
/// # Example
///
/// ```rust,ignore
/// use podcaster_core::testing::{MockRemoteApi, ScriptStep};
///
/// let api = MockRemoteApi::new("https://factory.test/v1/jobs");
/// api.set_default_script(vec![
///     ScriptStep::Pending,
///     ScriptStep::complete_with("audio", "/files/a.wav"),
/// ]);
///
/// let id = api.create(&RemoteJobRequest::narration("Tides")).await?;
/// assert_eq!(id, "remote-1");
/// ```
pub struct MockRemoteApi {
    base_url: String,
    next_id: AtomicUsize,
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockRemoteApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemoteApi")
            .field("base_url", &self.base_url)
            .field("state", &"<state>")
            .finish()
    }
}

impl MockRemoteApi {
    /// Create a mock factory whose jobs never finish.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            next_id: AtomicUsize::new(1),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the status answers for one remote job id.
    pub fn script_status(&self, remote_job_id: &str, steps: Vec<ScriptStep>) {
        self.state()
            .scripts
            .insert(remote_job_id.to_string(), steps.into());
    }

    /// Script applied to every job created from now on.
    pub fn set_default_script(&self, steps: Vec<ScriptStep>) {
        self.state().default_script = steps;
    }

    /// Make every create call fail.
    pub fn fail_creates(&self, message: &str) {
        self.state().create_error = Some(message.to_string());
    }

    /// Delay every create call by `delay`.
    pub fn delay_creates(&self, delay: Duration) {
        self.state().create_delay = Some(delay);
    }

    /// Serve `bytes` for `location`.
    pub fn set_artifact(&self, location: &str, content_type: Option<&str>, bytes: &[u8]) {
        self.state().artifacts.insert(
            location.to_string(),
            ArtifactPayload {
                content_type: content_type.map(str::to_string),
                bytes: bytes.to_vec(),
            },
        );
    }

    /// Create requests received so far.
    pub fn requests(&self) -> Vec<RemoteJobRequest> {
        self.state().requests.clone()
    }

    /// Topics of the create requests, in call order.
    pub fn created_topics(&self) -> Vec<String> {
        self.state()
            .requests
            .iter()
            .map(|request| request.topic.clone())
            .collect()
    }

    /// Number of status checks made for a remote job.
    pub fn status_calls(&self, remote_job_id: &str) -> usize {
        self.state()
            .status_calls
            .get(remote_job_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RemoteJobApi for MockRemoteApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create(&self, request: &RemoteJobRequest) -> Result<String, RemoteError> {
        let delay = self.state().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.requests.push(request.clone());

        if let Some(message) = &state.create_error {
            return Err(RemoteError::Api {
                status: 500,
                message: message.clone(),
            });
        }

        let id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        if !state.scripts.contains_key(&id) {
            let script = state.default_script.iter().cloned().collect();
            state.scripts.insert(id.clone(), script);
        }
        Ok(id)
    }

    async fn get_status(&self, remote_job_id: &str) -> Result<RemoteJobResult, RemoteError> {
        let mut state = self.state();
        *state
            .status_calls
            .entry(remote_job_id.to_string())
            .or_insert(0) += 1;

        let step = state
            .scripts
            .get_mut(remote_job_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ScriptStep::Pending);
        step.into_result(remote_job_id)
    }

    async fn fetch_artifact(&self, location: &str) -> Result<ArtifactPayload, RemoteError> {
        if !location.starts_with("http://") && !location.starts_with("https://") {
            return Err(RemoteError::InvalidLocation(location.to_string()));
        }
        self.state()
            .artifacts
            .get(location)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(location.to_string()))
    }
}
