//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the remote factory trait so the
//! orchestrator and the HTTP layer can be exercised without a real service.
//!
//! # Example
//!
//! ```rust,ignore
//! use podcaster_core::testing::{fixtures, MockRemoteApi, ScriptStep};
//!
//! let audio = Arc::new(MockRemoteApi::new("https://factory.test/v1/jobs"));
//! audio.set_default_script(vec![ScriptStep::complete_with("audio", "/files/a.wav")]);
//!
//! let orchestrator = fixtures::orchestrator(1, audio.clone(), None);
//! let receipt = orchestrator.submit("Tides")?;
//! ```

mod mock_remote_api;

pub use mock_remote_api::{MockRemoteApi, ScriptStep};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::config::{FactoryConfig, GenerationConfig};
    use crate::job::InMemoryJobStore;
    use crate::limiter::AdmissionLimiter;
    use crate::orchestrator::PodcastOrchestrator;
    use crate::remote::RemoteJobApi;

    /// Generation settings with a 1ms poll interval.
    pub fn fast_generation_config(max_poll_attempts: u32) -> GenerationConfig {
        GenerationConfig {
            poll_interval_ms: 1,
            max_poll_attempts,
            ..GenerationConfig::default()
        }
    }

    /// Factory endpoint config pointing at `url`.
    pub fn factory_config(url: &str) -> FactoryConfig {
        FactoryConfig {
            url: url.to_string(),
            bearer_token: "test-token".to_string(),
            user_id: "anonymous-podcast".to_string(),
            timeout_secs: 5,
        }
    }

    /// Orchestrator over an in-memory store with fast polling (20 attempts).
    pub fn orchestrator(
        capacity: usize,
        audio_api: Arc<dyn RemoteJobApi>,
        thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
    ) -> PodcastOrchestrator {
        orchestrator_with_config(
            fast_generation_config(20),
            capacity,
            audio_api,
            thumbnail_api,
        )
    }

    /// Orchestrator over an in-memory store with the given generation config.
    pub fn orchestrator_with_config(
        config: GenerationConfig,
        capacity: usize,
        audio_api: Arc<dyn RemoteJobApi>,
        thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
    ) -> PodcastOrchestrator {
        let limiter = AdmissionLimiter::new(capacity).expect("capacity must be at least 1");
        PodcastOrchestrator::new(
            config,
            limiter,
            Arc::new(InMemoryJobStore::new()),
            audio_api,
            thumbnail_api,
        )
    }
}
