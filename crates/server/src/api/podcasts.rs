//! Podcast API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use podcaster_core::{Job, JobStoreError, LimiterStats, SubmitError, SubmitReceipt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

use super::ErrorResponse;
use crate::state::AppState;

const CAPACITY_MESSAGE: &str = "Server is at capacity. Please try again in a moment.";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body returned with 503 when the reject policy turns a job away.
#[derive(Debug, Serialize)]
pub struct CapacityErrorResponse {
    pub error: String,
    pub queue_info: QueueInfo,
}

#[derive(Debug, Serialize)]
pub struct QueueInfo {
    pub active_generations: usize,
    pub max_concurrent: usize,
}

/// A job record with the proxy paths a browser can load its artifacts from.
#[derive(Debug, Serialize)]
pub struct PodcastResponse {
    #[serde(flatten)]
    pub job: Job,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl From<Job> for PodcastResponse {
    fn from(job: Job) -> Self {
        let audio_url = job.audio_artifact_location.as_deref().map(audio_proxy_path);
        let thumbnail_url = job
            .thumbnail_artifact_location
            .as_deref()
            .map(thumbnail_proxy_path);
        Self {
            job,
            audio_url,
            thumbnail_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub concurrency: LimiterStats,
    pub timestamp: DateTime<Utc>,
}

impl From<LimiterStats> for StatsResponse {
    fn from(concurrency: LimiterStats) -> Self {
        Self {
            concurrency,
            timestamp: Utc::now(),
        }
    }
}

/// Proxy path serving the audio at `location`.
pub fn audio_proxy_path(location: &str) -> String {
    format!("/api/v1/audio/{}", urlencoding::encode(location))
}

/// Proxy path serving the thumbnail at `location`. Local paths are served as is.
pub fn thumbnail_proxy_path(location: &str) -> String {
    if location.starts_with('/') {
        location.to_string()
    } else {
        format!("/api/v1/thumbnail/{}", urlencoding::encode(location))
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /podcasts - submit a topic for generation.
pub async fn create_podcast(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitReceipt>), Response> {
    let topic = body
        .ok()
        .and_then(|Json(value)| value.get("topic").and_then(Value::as_str).map(str::to_owned))
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "Topic is required and must be a string",
            )
        })?;

    match state.orchestrator().submit(&topic) {
        Ok(receipt) => Ok((StatusCode::CREATED, Json(receipt))),
        Err(SubmitError::InvalidInput(message)) => {
            Err(error_response(StatusCode::BAD_REQUEST, message))
        }
        Err(SubmitError::AtCapacity { active, capacity }) => {
            warn!(active, capacity, "Rejected podcast: at capacity");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(CapacityErrorResponse {
                    error: CAPACITY_MESSAGE.to_string(),
                    queue_info: QueueInfo {
                        active_generations: active,
                        max_concurrent: capacity,
                    },
                }),
            )
                .into_response())
        }
        Err(SubmitError::Stopped) => Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server is shutting down",
        )),
        Err(SubmitError::Store(e)) => {
            error!("Failed to store podcast job: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

/// GET /podcasts/{id} - current state of a job.
pub async fn get_podcast(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PodcastResponse>, Response> {
    match state.orchestrator().job(&id) {
        Ok(job) => Ok(Json(PodcastResponse::from(job))),
        Err(JobStoreError::NotFound(_)) => {
            Err(error_response(StatusCode::NOT_FOUND, "Podcast not found"))
        }
        Err(e) => {
            error!("Failed to load podcast {}: {}", id, e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

/// GET /podcasts/stats - limiter counters.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.orchestrator().limiter_stats()))
}

/// PUT /podcasts/stats/capacity - resize the limiter at runtime.
pub async fn set_capacity(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StatsResponse>, Response> {
    let capacity = body
        .ok()
        .and_then(|Json(value)| value.get("capacity").and_then(Value::as_u64))
        .and_then(|capacity| usize::try_from(capacity).ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "Capacity is required and must be a positive integer",
            )
        })?;

    state
        .orchestrator()
        .set_capacity(capacity)
        .map(|stats| Json(StatsResponse::from(stats)))
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_proxy_path_encodes_location() {
        assert_eq!(
            audio_proxy_path("https://factory.test/files/a.wav?user_id=x"),
            "/api/v1/audio/https%3A%2F%2Ffactory.test%2Ffiles%2Fa.wav%3Fuser_id%3Dx"
        );
    }

    #[test]
    fn test_thumbnail_proxy_path_keeps_local_paths() {
        assert_eq!(
            thumbnail_proxy_path("/thumbnails/default.svg"),
            "/thumbnails/default.svg"
        );
        assert_eq!(
            thumbnail_proxy_path("https://cdn.test/t.png"),
            "/api/v1/thumbnail/https%3A%2F%2Fcdn.test%2Ft.png"
        );
    }

    #[test]
    fn test_podcast_response_adds_proxy_paths() {
        let job = Job::new("Tides", podcaster_core::JobStatus::Processing).into_completed(
            "https://factory.test/a.wav".to_string(),
            "/thumbnails/default.svg".to_string(),
            Utc::now(),
        );
        let value = serde_json::to_value(PodcastResponse::from(job)).unwrap();

        assert_eq!(value["status"], "completed");
        assert_eq!(value["title"], "60 seconds on: Tides");
        assert_eq!(
            value["audio_url"],
            "/api/v1/audio/https%3A%2F%2Ffactory.test%2Fa.wav"
        );
        assert_eq!(value["thumbnail_url"], "/thumbnails/default.svg");
    }

    #[test]
    fn test_podcast_response_omits_missing_artifacts() {
        let job = Job::new("Tides", podcaster_core::JobStatus::Queued);
        let value = serde_json::to_value(PodcastResponse::from(job)).unwrap();

        assert_eq!(value["status"], "queued");
        assert!(value.get("audio_url").is_none());
        assert!(value.get("thumbnail_url").is_none());
    }
}
