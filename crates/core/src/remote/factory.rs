//! HTTP client for a generation factory.
//!
//! Jobs are created with `POST {url}` and polled with
//! `GET {url}/{id}?user_id=...`. Every request carries the configured
//! bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::types::{ArtifactPayload, CreatedJob, RemoteJobRequest, RemoteJobResult};
use super::{RemoteError, RemoteJobApi};
use crate::config::FactoryConfig;

/// Factory API client.
pub struct FactoryClient {
    client: Client,
    base_url: String,
    bearer_token: String,
    user_id: String,
}

#[derive(Serialize)]
struct CreateJobBody<'a> {
    data: CreateJobData<'a>,
    factory_settings: &'a Value,
    metadata: JobMetadata<'a>,
}

#[derive(Serialize)]
struct CreateJobData<'a> {
    text: TextInput<'a>,
}

#[derive(Serialize)]
struct TextInput<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Serialize)]
struct JobMetadata<'a> {
    user_id: &'a str,
    topic: &'a str,
}

impl FactoryClient {
    /// Create a new factory client.
    pub fn new(config: FactoryConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token,
            user_id: config.user_id,
        })
    }

    fn status_url(&self, remote_job_id: &str) -> String {
        format!(
            "{}/{}?user_id={}",
            self.base_url,
            urlencoding::encode(remote_job_id),
            urlencoding::encode(&self.user_id)
        )
    }

    /// Whether `url` points at the factory's own origin, so credentials may be sent.
    fn is_factory_origin(&self, url: &Url) -> bool {
        Url::parse(&self.base_url)
            .map(|base| base.origin() == url.origin())
            .unwrap_or(false)
    }

    async fn error_for(response: reqwest::Response, what: &str) -> RemoteError {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return RemoteError::NotFound(what.to_string());
        }
        let body = response.text().await.unwrap_or_default();
        RemoteError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl RemoteJobApi for FactoryClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create(&self, request: &RemoteJobRequest) -> Result<String, RemoteError> {
        let body = CreateJobBody {
            data: CreateJobData {
                text: TextInput {
                    content: &request.content,
                    language: request.language.as_deref(),
                },
            },
            factory_settings: &request.factory_settings,
            metadata: JobMetadata {
                user_id: &self.user_id,
                topic: &request.topic,
            },
        };

        debug!("Creating factory job at {}", self.base_url);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &self.base_url).await);
        }

        let created: CreatedJob = response.json().await.map_err(|e| {
            RemoteError::Parse(format!("Failed to parse job creation response: {}", e))
        })?;

        if created.id.is_empty() {
            return Err(RemoteError::Parse(
                "Job creation response has an empty id".to_string(),
            ));
        }

        Ok(created.id)
    }

    async fn get_status(&self, remote_job_id: &str) -> Result<RemoteJobResult, RemoteError> {
        let url = self.status_url(remote_job_id);

        debug!("Polling factory job {}", remote_job_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &format!("job {}", remote_job_id)).await);
        }

        response.json().await.map_err(|e| {
            RemoteError::Parse(format!("Failed to parse job status response: {}", e))
        })
    }

    async fn fetch_artifact(&self, location: &str) -> Result<ArtifactPayload, RemoteError> {
        let mut url =
            Url::parse(location).map_err(|e| RemoteError::InvalidLocation(e.to_string()))?;

        if !url.query_pairs().any(|(key, _)| key == "user_id") {
            url.query_pairs_mut().append_pair("user_id", &self.user_id);
        }

        debug!("Fetching artifact {}", url);

        let mut request = self.client.get(url.clone());
        if self.is_factory_origin(&url) {
            request = request.bearer_auth(&self.bearer_token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, location).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(ArtifactPayload {
            content_type,
            bytes,
        })
    }
}
