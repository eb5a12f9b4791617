pub mod config;
pub mod job;
pub mod limiter;
pub mod metrics;
pub mod orchestrator;
pub mod remote;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, AdmissionPolicy, Config, ConfigError,
    FactoryConfig, GenerationConfig, SanitizedConfig,
};
pub use job::{InMemoryJobStore, Job, JobStatus, JobStore, JobStoreError};
pub use limiter::{AdmissionLimiter, AdmissionSlot, LimiterError, LimiterStats};
pub use orchestrator::{
    GenerationError, PodcastOrchestrator, SubmitError, SubmitReceipt, ThumbnailOutcome,
};
pub use remote::{FactoryClient, MediaKind, RemoteError, RemoteJobApi};
