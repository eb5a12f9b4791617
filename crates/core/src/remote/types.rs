//! Factory request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kind of media a remote job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to ask a factory to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteJobRequest {
    /// Prompt text sent as `data.text.content`.
    pub content: String,
    /// Optional `data.text.language`.
    pub language: Option<String>,
    /// Factory-specific generation settings, passed through verbatim.
    pub factory_settings: Value,
    /// Original user topic, recorded in job metadata.
    pub topic: String,
}

impl RemoteJobRequest {
    /// Narration job: a short two-speaker educational podcast.
    pub fn narration(topic: &str) -> Self {
        Self {
            content: format!(
                "Explain the following topic in a concise, engaging way suitable for a 60-second audio podcast: {}",
                topic
            ),
            language: None,
            factory_settings: json!({
                "content_type": "general",
                "style": "educational",
                "length": "short",
                "speaker1_voice_style": "conversational and inquisitive",
                "speaker2_voice_style": "confident and articulate",
                "enable_background_music": false,
                "preprocess_only": false
            }),
            topic: topic.to_string(),
        }
    }

    /// Thumbnail job: a wide illustration without text.
    pub fn thumbnail(topic: &str) -> Self {
        Self {
            content: format!(
                "A Ghibli style image representing the following topic (do not include text in the image): {}.",
                topic
            ),
            language: Some("en".to_string()),
            factory_settings: json!({
                "num_inference_steps": 50,
                "enhance_prompt": true,
                "preprocess_only": false,
                "width": 1664,
                "height": 928
            }),
            topic: topic.to_string(),
        }
    }
}

/// Status reported by the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteJobStatus {
    Completed,
    Failed,
    /// Any other value (`queued`, `running`, ...): not terminal yet.
    InProgress(String),
}

impl RemoteJobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteJobStatus::InProgress(_))
    }
}

impl From<String> for RemoteJobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "completed" => RemoteJobStatus::Completed,
            "failed" => RemoteJobStatus::Failed,
            _ => RemoteJobStatus::InProgress(value),
        }
    }
}

impl From<RemoteJobStatus> for String {
    fn from(status: RemoteJobStatus) -> Self {
        match status {
            RemoteJobStatus::Completed => "completed".to_string(),
            RemoteJobStatus::Failed => "failed".to_string(),
            RemoteJobStatus::InProgress(value) => value,
        }
    }
}

/// An entry of a job's `artifacts` or `output` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArtifact {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl RemoteArtifact {
    /// Artifact with a declared type and URL.
    pub fn typed(kind: &str, url: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    /// Where the artifact can be fetched: `url`, falling back to `uri`.
    pub fn location(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.uri.as_deref().filter(|s| !s.is_empty()))
    }

    /// Declared type equals the kind, or the mime type mentions it.
    pub fn matches(&self, kind: MediaKind) -> bool {
        self.kind.as_deref() == Some(kind.as_str())
            || self
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.contains(kind.as_str()))
    }
}

/// Error reported by the factory: either a bare string or an object with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteErrorBody {
    Message(String),
    Detailed { message: String },
    Other(Value),
}

impl RemoteErrorBody {
    pub fn message(&self) -> String {
        match self {
            RemoteErrorBody::Message(message) | RemoteErrorBody::Detailed { message } => {
                message.clone()
            }
            RemoteErrorBody::Other(value) => value.to_string(),
        }
    }
}

/// Body of a job status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteJobResult {
    pub status: RemoteJobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<RemoteArtifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<RemoteArtifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteErrorBody>,
}

impl RemoteJobResult {
    pub fn in_progress(status: &str) -> Self {
        Self {
            status: RemoteJobStatus::InProgress(status.to_string()),
            artifacts: None,
            output: None,
            error: None,
        }
    }

    pub fn completed(artifacts: Vec<RemoteArtifact>, output: Vec<RemoteArtifact>) -> Self {
        Self {
            status: RemoteJobStatus::Completed,
            artifacts: Some(artifacts),
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: RemoteJobStatus::Failed,
            artifacts: None,
            output: None,
            error: Some(RemoteErrorBody::Message(message.to_string())),
        }
    }

    pub fn artifacts(&self) -> &[RemoteArtifact] {
        self.artifacts.as_deref().unwrap_or_default()
    }

    pub fn output(&self) -> &[RemoteArtifact] {
        self.output.as_deref().unwrap_or_default()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(RemoteErrorBody::message)
    }
}

/// Response to a job creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedJob {
    pub id: String,
}

/// Bytes of a fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayload {
    /// Upstream `Content-Type`, if it sent one.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}
