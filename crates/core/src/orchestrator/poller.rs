//! Remote job status polling.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::types::{GenerationError, PollPolicy};
use crate::metrics;
use crate::remote::{MediaKind, RemoteError, RemoteJobApi, RemoteJobResult, RemoteJobStatus};

/// Poll a remote job until it reports a terminal status.
///
/// Each attempt waits `policy.interval` and then checks the status once.
/// A failed check (network error, non-2xx) only costs that attempt; a 404
/// ends polling. Returns the completed payload, or an error when the job
/// failed, vanished, ran out of attempts, or `shutdown` flipped to `true`.
pub async fn poll_remote_job(
    api: &dyn RemoteJobApi,
    remote_job_id: &str,
    kind: MediaKind,
    policy: &PollPolicy,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<RemoteJobResult, GenerationError> {
    for attempt in 1..=policy.max_attempts {
        let checked = tokio::select! {
            _ = stopped(shutdown) => {
                info!("Polling {} job {} interrupted by shutdown", kind, remote_job_id);
                return Err(GenerationError::Cancelled);
            }
            checked = async {
                tokio::time::sleep(policy.interval).await;
                api.get_status(remote_job_id).await
            } => checked,
        };

        match checked {
            Ok(result) => match result.status {
                RemoteJobStatus::Completed => {
                    record_attempt(kind, "completed");
                    debug!(
                        "{} job {} completed after {} checks",
                        kind, remote_job_id, attempt
                    );
                    return Ok(result);
                }
                RemoteJobStatus::Failed => {
                    record_attempt(kind, "failed");
                    let message = result
                        .error_message()
                        .unwrap_or_else(|| format!("{} generation failed", kind));
                    return Err(GenerationError::RemoteJobFailed { kind, message });
                }
                RemoteJobStatus::InProgress(ref status) => {
                    record_attempt(kind, "pending");
                    debug!(
                        "{} job {} is {} ({}/{})",
                        kind, remote_job_id, status, attempt, policy.max_attempts
                    );
                }
            },
            Err(RemoteError::NotFound(_)) => {
                record_attempt(kind, "error");
                return Err(GenerationError::RemoteJobNotFound {
                    kind,
                    remote_job_id: remote_job_id.to_string(),
                });
            }
            Err(e) => {
                record_attempt(kind, "error");
                warn!(
                    "Status check {}/{} for {} job {} failed: {}",
                    attempt, policy.max_attempts, kind, remote_job_id, e
                );
            }
        }
    }

    Err(GenerationError::RemotePollTimeout {
        kind,
        remote_job_id: remote_job_id.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is gone.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn record_attempt(kind: MediaKind, outcome: &str) {
    metrics::POLL_ATTEMPTS
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}
