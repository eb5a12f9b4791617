//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the in-process router
//! with mock remote factories injected, so the HTTP surface can be
//! exercised without a real factory.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use podcaster_core::{
    load_config_from_str, AdmissionPolicy, PodcastOrchestrator, RemoteJobApi,
    testing::{fixtures, MockRemoteApi},
};
use podcaster_server::api::create_router;
use podcaster_server::state::AppState;

/// Re-export mock types for test convenience
pub use podcaster_core::testing::ScriptStep;

pub const AUDIO_FACTORY: &str = "https://audio.factory.test/v1/jobs";
pub const THUMBNAIL_FACTORY: &str = "https://image.factory.test/v1/jobs";

/// Test fixture for API testing with mock factories.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/podcasts", json!({ "topic": "Tides" })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock audio factory - script narration jobs and serve audio bytes
    pub audio: Arc<MockRemoteApi>,
    /// Mock thumbnail factory - script image jobs and serve image bytes
    pub thumbnail: Arc<MockRemoteApi>,
    /// Orchestrator shared with the router
    pub orchestrator: PodcastOrchestrator,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TestConfig {
    pub capacity: usize,
    pub admission_policy: AdmissionPolicy,
    /// Wire a thumbnail factory into the app state.
    pub with_thumbnail: bool,
    /// Delay before each remote status check.
    pub poll_interval_ms: u64,
}

impl TestConfig {
    /// Remote jobs that stay running for the duration of a test.
    pub fn holding_slots(capacity: usize) -> Self {
        Self {
            capacity,
            poll_interval_ms: 60_000,
            ..Self::default()
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            admission_policy: AdmissionPolicy::Queue,
            with_thumbnail: true,
            poll_interval_ms: 1,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let toml = format!(
            r#"
[limiter]
max_concurrent = {capacity}

[audio]
url = "{audio_url}"
bearer_token = "audio-secret"

[thumbnail]
url = "{thumbnail_url}"
bearer_token = "image-secret"
"#,
            capacity = test_config.capacity,
            audio_url = AUDIO_FACTORY,
            thumbnail_url = THUMBNAIL_FACTORY,
        );
        let mut config = load_config_from_str(&toml).expect("Failed to parse test config");
        config.generation = fixtures::fast_generation_config(20);
        config.generation.admission_policy = test_config.admission_policy;
        config.generation.poll_interval_ms = test_config.poll_interval_ms;

        let audio = Arc::new(MockRemoteApi::new(AUDIO_FACTORY));
        let thumbnail = Arc::new(MockRemoteApi::new(THUMBNAIL_FACTORY));

        let audio_api: Arc<dyn RemoteJobApi> = audio.clone();
        let thumbnail_api: Option<Arc<dyn RemoteJobApi>> = if test_config.with_thumbnail {
            Some(thumbnail.clone())
        } else {
            config.thumbnail = None;
            None
        };

        let orchestrator = fixtures::orchestrator_with_config(
            config.generation.clone(),
            test_config.capacity,
            audio_api.clone(),
            thumbnail_api.clone(),
        );

        let state = Arc::new(AppState::new(
            config,
            orchestrator.clone(),
            audio_api,
            thumbnail_api,
        ));

        Self {
            router: create_router(state),
            audio,
            thumbnail,
            orchestrator,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.raw_request("POST", path, body).await
    }

    pub async fn put_raw(&self, path: &str, body: &str) -> TestResponse {
        self.raw_request("PUT", path, body).await
    }

    async fn raw_request(&self, method: &str, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Poll `GET /podcasts/{id}` until `done` accepts the body.
    pub async fn wait_for_podcast<F>(&self, id: &str, done: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        let path = format!("/api/v1/podcasts/{}", id);
        for _ in 0..500 {
            let response = self.get(&path).await;
            if done(&response.body) {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("podcast {} did not reach the expected state", id);
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes: body_bytes.to_vec(),
        }
    }
}
