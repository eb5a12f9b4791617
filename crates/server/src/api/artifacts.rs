//! Artifact proxy handlers.
//!
//! Generated files live on the factory behind bearer auth, so the browser
//! loads them through these endpoints. The path segment is the
//! percent-encoded absolute location of the artifact.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use podcaster_core::{remote::ArtifactPayload, RemoteError, RemoteJobApi};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::ErrorResponse;
use crate::metrics::ARTIFACT_PROXY_REQUESTS;
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Default, Deserialize)]
pub struct AudioQuery {
    /// `true` asks the browser to save the file instead of playing it.
    pub download: Option<String>,
    pub topic: Option<String>,
}

/// GET /audio/{location} - stream a generated narration.
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
    Query(query): Query<AudioQuery>,
) -> Response {
    let mut response = match proxy(state.audio_api(), "audio", &location, "audio/wav").await {
        Ok(response) => response,
        Err(response) => return response,
    };

    if query.download.as_deref() == Some("true") {
        let topic = query.topic.as_deref().unwrap_or("podcast");
        let disposition = format!("attachment; filename=\"{}-podcast.wav\"", slugify(topic));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    response
}

/// GET /thumbnail/{location} - stream a generated thumbnail.
///
/// The placeholder and other files under `/thumbnails/` redirect to the
/// static file. Any other local path is refused.
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(location): Path<String>,
) -> Response {
    if location.starts_with('/') {
        if !is_static_thumbnail(&location, state.default_thumbnail()) {
            warn!("Refusing to redirect thumbnail request to {}", location);
            ARTIFACT_PROXY_REQUESTS
                .with_label_values(&["thumbnail", "error"])
                .inc();
            return proxy_error("thumbnail", RemoteError::InvalidLocation(location));
        }
        ARTIFACT_PROXY_REQUESTS
            .with_label_values(&["thumbnail", "redirected"])
            .inc();
        return Redirect::temporary(&location).into_response();
    }

    match proxy(state.thumbnail_api(), "thumbnail", &location, "image/png").await {
        Ok(response) | Err(response) => response,
    }
}

/// Same-origin static thumbnail paths only.
fn is_static_thumbnail(location: &str, default_thumbnail: &str) -> bool {
    if location == default_thumbnail {
        return true;
    }
    location.starts_with("/thumbnails/")
        && !location.contains("..")
        && !location.contains('\\')
        && !location.contains("//")
}

async fn proxy(
    api: &dyn RemoteJobApi,
    label: &str,
    location: &str,
    default_content_type: &'static str,
) -> Result<Response, Response> {
    match api.fetch_artifact(location).await {
        Ok(payload) => {
            debug!(
                "Proxying {} artifact ({} bytes) from {}",
                label,
                payload.bytes.len(),
                location
            );
            ARTIFACT_PROXY_REQUESTS
                .with_label_values(&[label, "streamed"])
                .inc();
            Ok(artifact_response(payload, default_content_type))
        }
        Err(e) => {
            warn!("Failed to fetch {} from {}: {}", label, location, e);
            ARTIFACT_PROXY_REQUESTS
                .with_label_values(&[label, "error"])
                .inc();
            Err(proxy_error(label, e))
        }
    }
}

fn artifact_response(payload: ArtifactPayload, default_content_type: &'static str) -> Response {
    let content_type = payload
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or(HeaderValue::from_static(default_content_type));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.bytes.len()));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));

    (StatusCode::OK, headers, payload.bytes).into_response()
}

/// Upstream error statuses pass through; transport failures become 502.
fn proxy_error(label: &str, err: RemoteError) -> Response {
    let (status, message) = match err {
        RemoteError::InvalidLocation(_) => {
            (StatusCode::BAD_REQUEST, format!("Invalid {} URL", label))
        }
        RemoteError::NotFound(_) => (StatusCode::NOT_FOUND, format!("Failed to fetch {}", label)),
        RemoteError::Api { status, .. } => (
            StatusCode::from_u16(status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            format!("Failed to fetch {}", label),
        ),
        RemoteError::Http(_) | RemoteError::Parse(_) => {
            (StatusCode::BAD_GATEWAY, format!("Failed to fetch {}", label))
        }
    };
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Lowercased topic with whitespace runs turned into dashes, safe for a header.
fn slugify(topic: &str) -> String {
    let slug = topic
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "podcast".to_string()
    } else {
        slug
    }
}
