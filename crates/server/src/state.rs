use std::sync::Arc;
use podcaster_core::{Config, PodcastOrchestrator, RemoteJobApi, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: PodcastOrchestrator,
    audio_api: Arc<dyn RemoteJobApi>,
    thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: PodcastOrchestrator,
        audio_api: Arc<dyn RemoteJobApi>,
        thumbnail_api: Option<Arc<dyn RemoteJobApi>>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            audio_api,
            thumbnail_api,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &PodcastOrchestrator {
        &self.orchestrator
    }

    /// Placeholder thumbnail path served from `public/`.
    pub fn default_thumbnail(&self) -> &str {
        &self.config.generation.default_thumbnail
    }

    /// Factory used to fetch audio artifacts.
    pub fn audio_api(&self) -> &dyn RemoteJobApi {
        self.audio_api.as_ref()
    }

    /// Factory used to fetch thumbnails; the audio factory when none is configured.
    pub fn thumbnail_api(&self) -> &dyn RemoteJobApi {
        self.thumbnail_api
            .as_deref()
            .unwrap_or(self.audio_api.as_ref())
    }
}
