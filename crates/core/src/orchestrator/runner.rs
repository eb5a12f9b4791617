//! Podcast orchestrator implementation.
//!
//! Each accepted job runs in its own task under the admission limiter:
//! - Audio and thumbnail remote jobs are created together; each id is
//!   stored as soon as its create returns
//! - Audio is polled inline; failure there fails the job
//! - Thumbnail is polled in a side task that always yields an outcome

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{AdmissionPolicy, GenerationConfig};
use crate::job::{Job, JobStatus, JobStore, JobStoreError};
use crate::limiter::{Admission, AdmissionLimiter, LimiterError, LimiterStats};
use crate::metrics;
use crate::remote::{MediaKind, RemoteError, RemoteJobApi, RemoteJobRequest, RemoteJobResult};

use super::artifact::extract_artifact;
use super::poller::poll_remote_job;
use super::types::{GenerationError, PollPolicy, SubmitError, SubmitReceipt, ThumbnailOutcome};

/// Longest accepted topic, in characters after trimming.
pub const MAX_TOPIC_CHARS: usize = 128;

/// Drives podcast jobs from submission to a terminal record.
///
/// Cloning is cheap; clones share the limiter, the store and the shutdown signal.
#[derive(Clone)]
pub struct PodcastOrchestrator {
    config: GenerationConfig,
    limiter: AdmissionLimiter,
    store: Arc<dyn JobStore>,
    audio_api: Arc<dyn RemoteJobApi>,
    thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl PodcastOrchestrator {
    /// Create a new orchestrator. Without a thumbnail factory every job gets the placeholder.
    pub fn new(
        config: GenerationConfig,
        limiter: AdmissionLimiter,
        store: Arc<dyn JobStore>,
        audio_api: Arc<dyn RemoteJobApi>,
        thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            limiter,
            store,
            audio_api,
            thumbnail_api,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Accept a new podcast job.
    ///
    /// Returns as soon as the record is written. The job starts in
    /// `processing` when a slot was free and in `queued` otherwise, holding
    /// its place in line from this call on. Under [`AdmissionPolicy::Reject`]
    /// a saturated limiter refuses it instead.
    pub fn submit(&self, topic: &str) -> Result<SubmitReceipt, SubmitError> {
        if self.is_stopped() {
            return Err(SubmitError::Stopped);
        }

        let topic = validate_topic(topic)?;

        let admission = match self.config.admission_policy {
            AdmissionPolicy::Queue => self.limiter.reserve(),
            AdmissionPolicy::Reject => match self.limiter.try_acquire() {
                Some(slot) => Admission::Ready(slot),
                None => {
                    let stats = self.limiter.stats();
                    metrics::JOBS_REJECTED.inc();
                    info!(
                        "Rejected podcast request at capacity ({}/{})",
                        stats.active_count, stats.capacity
                    );
                    return Err(SubmitError::AtCapacity {
                        active: stats.active_count,
                        capacity: stats.capacity,
                    });
                }
            },
        };

        let status = if admission.is_queued() {
            JobStatus::Queued
        } else {
            JobStatus::Processing
        };
        let job = self.store.create(Job::new(topic, status))?;

        metrics::JOBS_SUBMITTED
            .with_label_values(&[status.as_str()])
            .inc();
        info!("Accepted podcast job {} ({}): {}", job.id, status, job.topic);

        let orchestrator = self.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            let _slot = admission.into_slot().await;
            orchestrator.run_generation(&job_id).await;
        });

        Ok(SubmitReceipt {
            id: job.id,
            status: job.status,
            topic: job.topic,
        })
    }

    /// Poll a remote job on this orchestrator's interval and attempt budget.
    pub async fn poll_remote_job(
        &self,
        api: &dyn RemoteJobApi,
        remote_job_id: &str,
        kind: MediaKind,
    ) -> Result<RemoteJobResult, GenerationError> {
        let mut shutdown = self.shutdown_tx.subscribe();
        poll_remote_job(api, remote_job_id, kind, &self.poll_policy(), &mut shutdown).await
    }

    /// Run the whole generation for an admitted job and return its final record.
    ///
    /// The caller must hold a limiter slot. Errors are returned, not recorded;
    /// see `run_generation`.
    pub async fn process_generation(&self, job_id: &str) -> Result<Job, GenerationError> {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return Err(GenerationError::Cancelled);
        }

        let mut job = self
            .store
            .get(job_id)?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        if job.status == JobStatus::Queued {
            job = self.store.put(job.into_processing())?;
            debug!("Job {} admitted from queue", job_id);
        }

        let audio_request = RemoteJobRequest::narration(&job.topic);
        let thumbnail_create = self.thumbnail_api.as_ref().map(|api| {
            let api = Arc::clone(api);
            let request = RemoteJobRequest::thumbnail(&job.topic);
            tokio::spawn(async move { api.create(&request).await })
        });

        let audio_created = self.audio_api.create(&audio_request).await;
        record_create(MediaKind::Audio, audio_created.is_ok());
        let audio_job_id = match audio_created {
            Ok(id) => id,
            Err(source) => {
                if let Some(thumbnail_job_id) =
                    await_thumbnail_create(thumbnail_create, job_id).await
                {
                    job.remote_thumbnail_job_id = Some(thumbnail_job_id);
                    if let Err(e) = self.store.put(job) {
                        error!("Failed to store thumbnail job id of {}: {}", job_id, e);
                    }
                }
                return Err(GenerationError::RemoteCreateFailed {
                    kind: MediaKind::Audio,
                    source,
                });
            }
        };

        job.remote_audio_job_id = Some(audio_job_id.clone());
        job = self.store.put(job)?;
        info!("Job {} created remote audio job {}", job_id, audio_job_id);

        let thumbnail_job_id = await_thumbnail_create(thumbnail_create, job_id).await;
        if let Some(remote_job_id) = &thumbnail_job_id {
            job.remote_thumbnail_job_id = Some(remote_job_id.clone());
            job = self.store.put(job)?;
            debug!("Job {} created remote thumbnail job {}", job_id, remote_job_id);
        }

        let thumbnail_task = match (thumbnail_job_id, &self.thumbnail_api) {
            (Some(remote_job_id), Some(api)) => Some(tokio::spawn(generate_thumbnail(
                Arc::clone(api),
                remote_job_id,
                self.poll_policy(),
                self.shutdown_tx.subscribe(),
            ))),
            _ => None,
        };

        let audio_location = poll_remote_job(
            self.audio_api.as_ref(),
            &audio_job_id,
            MediaKind::Audio,
            &self.poll_policy(),
            &mut shutdown,
        )
        .await
        .and_then(|result| extract_artifact(&result, MediaKind::Audio, self.audio_api.base_url()));

        let audio_location = match audio_location {
            Ok(location) => location,
            Err(e) => {
                if let Some(task) = thumbnail_task {
                    task.abort();
                }
                return Err(e);
            }
        };

        let thumbnail = match thumbnail_task {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!("Thumbnail task for job {} ended abnormally: {}", job_id, e);
                ThumbnailOutcome::Placeholder
            }),
            None => ThumbnailOutcome::Placeholder,
        };
        if thumbnail.is_placeholder() {
            metrics::THUMBNAIL_PLACEHOLDERS.inc();
        }

        let completed = job.into_completed(
            audio_location,
            thumbnail.into_location(&self.config.default_thumbnail),
            Utc::now(),
        );
        Ok(self.store.put(completed)?)
    }

    /// Generation task body: run, then record the outcome on the job.
    async fn run_generation(&self, job_id: &str) {
        let started = Instant::now();

        match self.process_generation(job_id).await {
            Ok(job) => {
                metrics::JOBS_COMPLETED.inc();
                metrics::GENERATION_DURATION
                    .with_label_values(&["completed"])
                    .observe(started.elapsed().as_secs_f64());
                info!(
                    "Job {} completed in {:.1}s",
                    job.id,
                    started.elapsed().as_secs_f64()
                );
            }
            Err(e) => {
                metrics::JOBS_FAILED.with_label_values(&[e.reason()]).inc();
                metrics::GENERATION_DURATION
                    .with_label_values(&["failed"])
                    .observe(started.elapsed().as_secs_f64());
                warn!("Job {} failed: {}", job_id, e);
                self.record_failure(job_id, &e);
            }
        }
    }

    /// Move a job to `failed` with the error's detail, unless it is already terminal.
    fn record_failure(&self, job_id: &str, err: &GenerationError) {
        let job = match self.store.get(job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!("Cannot record failure of unknown job {}", job_id);
                return;
            }
            Err(e) => {
                error!("Cannot load job {} to record failure: {}", job_id, e);
                return;
            }
        };

        if job.status.is_terminal() {
            debug!("Job {} already {}, not recording failure", job_id, job.status);
            return;
        }

        if let Err(e) = self.store.put(job.into_failed(err.detail(), Utc::now())) {
            error!("Failed to record failure of job {}: {}", job_id, e);
        }
    }

    /// Current record of a job.
    pub fn job(&self, job_id: &str) -> Result<Job, JobStoreError> {
        self.store
            .get(job_id)?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }

    /// Total number of jobs.
    pub fn job_count(&self) -> Result<usize, JobStoreError> {
        self.store.count()
    }

    /// Number of jobs per status.
    pub fn job_counts(&self) -> Result<Vec<(JobStatus, usize)>, JobStoreError> {
        JobStatus::ALL
            .iter()
            .map(|status| {
                self.store
                    .count_by_status(*status)
                    .map(|count| (*status, count))
            })
            .collect()
    }

    pub fn limiter_stats(&self) -> LimiterStats {
        self.limiter.stats()
    }

    /// Change the limiter capacity; queued jobs are admitted right away if it grew.
    pub fn set_capacity(&self, capacity: usize) -> Result<LimiterStats, LimiterError> {
        self.limiter.set_capacity(capacity)?;
        info!("Generation capacity set to {}", capacity);
        Ok(self.limiter.stats())
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Stop accepting jobs and interrupt every poll loop.
    ///
    /// Interrupted jobs are recorded as failed. Jobs still queued fail as
    /// soon as they are admitted.
    pub fn stop(&self) {
        if self.shutdown_tx.send_replace(true) {
            warn!("Orchestrator already stopped");
            return;
        }
        info!("Stopping podcast orchestrator");
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config)
    }
}

/// Trim and check a topic.
fn validate_topic(topic: &str) -> Result<String, SubmitError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(SubmitError::InvalidInput(
            "Topic cannot be empty".to_string(),
        ));
    }
    if topic.chars().count() > MAX_TOPIC_CHARS {
        return Err(SubmitError::InvalidInput(format!(
            "Topic must be {} characters or less",
            MAX_TOPIC_CHARS
        )));
    }
    Ok(topic.to_string())
}

/// Thumbnail sub-flow. Every error becomes [`ThumbnailOutcome::Placeholder`].
async fn generate_thumbnail(
    api: Arc<dyn RemoteJobApi>,
    remote_job_id: String,
    policy: PollPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> ThumbnailOutcome {
    let location = poll_remote_job(
        api.as_ref(),
        &remote_job_id,
        MediaKind::Image,
        &policy,
        &mut shutdown,
    )
    .await
    .and_then(|result| extract_artifact(&result, MediaKind::Image, api.base_url()));

    match location {
        Ok(location) => ThumbnailOutcome::Generated(location),
        Err(e) => {
            warn!(
                "Thumbnail job {} failed, using placeholder: {}",
                remote_job_id, e
            );
            ThumbnailOutcome::Placeholder
        }
    }
}

/// Outcome of the concurrent thumbnail create. Failures only mean a placeholder.
async fn await_thumbnail_create(
    task: Option<JoinHandle<Result<String, RemoteError>>>,
    job_id: &str,
) -> Option<String> {
    let created = match task?.await {
        Ok(created) => created,
        Err(e) => {
            warn!("Thumbnail create for job {} ended abnormally: {}", job_id, e);
            record_create(MediaKind::Image, false);
            return None;
        }
    };
    record_create(MediaKind::Image, created.is_ok());
    match created {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(
                "Thumbnail job for {} could not be created, using placeholder: {}",
                job_id, e
            );
            None
        }
    }
}

fn record_create(kind: MediaKind, ok: bool) {
    metrics::REMOTE_CREATES
        .with_label_values(&[kind.as_str(), if ok { "success" } else { "error" }])
        .inc();
}
