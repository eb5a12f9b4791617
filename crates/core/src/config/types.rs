use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Remote factory producing the narration audio (mandatory).
    pub audio: FactoryConfig,
    /// Remote factory producing the thumbnail image. Thumbnails fall back
    /// to the placeholder when this is absent.
    #[serde(default)]
    pub thumbnail: Option<FactoryConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Admission limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterConfig {
    /// Maximum number of generations running against the factory at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

/// What `submit` does when every limiter slot is taken.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Accept the job in `queued` status and run it once a slot frees up.
    #[default]
    Queue,
    /// Refuse the job with `AtCapacity`.
    Reject,
}

/// Generation job behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub admission_policy: AdmissionPolicy,

    /// Delay before each status poll (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Poll attempts per remote job before giving up.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Location used when no thumbnail could be generated.
    #[serde(default = "default_thumbnail")]
    pub default_thumbnail: String,
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_max_poll_attempts() -> u32 {
    48 // 4 minutes at the default interval
}

fn default_thumbnail() -> String {
    "/thumbnails/default.svg".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            admission_policy: AdmissionPolicy::default(),
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            default_thumbnail: default_thumbnail(),
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Remote factory endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FactoryConfig {
    /// Job collection URL, e.g. "https://factory.example.com/v1/jobs".
    pub url: String,
    /// Bearer token attached to every factory request.
    pub bearer_token: String,
    /// User id sent in job metadata and status queries.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_user_id() -> String {
    "anonymous-podcast".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub limiter: LimiterConfig,
    pub generation: GenerationConfig,
    pub audio: SanitizedFactoryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<SanitizedFactoryConfig>,
}

/// Factory config with the bearer token hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFactoryConfig {
    pub url: String,
    pub bearer_token_configured: bool,
    pub user_id: String,
    pub timeout_secs: u32,
}

impl From<&FactoryConfig> for SanitizedFactoryConfig {
    fn from(config: &FactoryConfig) -> Self {
        Self {
            url: config.url.clone(),
            bearer_token_configured: !config.bearer_token.is_empty(),
            user_id: config.user_id.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            limiter: config.limiter.clone(),
            generation: config.generation.clone(),
            audio: SanitizedFactoryConfig::from(&config.audio),
            thumbnail: config.thumbnail.as_ref().map(SanitizedFactoryConfig::from),
        }
    }
}
