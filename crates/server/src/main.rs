use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podcaster_core::{
    load_config, validate_config, AdmissionLimiter, FactoryClient, InMemoryJobStore,
    PodcastOrchestrator, RemoteJobApi,
};
use podcaster_server::api::create_router;
use podcaster_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting podcaster v{}", VERSION);

    // Determine config path
    let config_path = std::env::var("PODCASTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Remote factories
    let audio_api: Arc<dyn RemoteJobApi> = Arc::new(
        FactoryClient::new(config.audio.clone()).context("Failed to create audio factory client")?,
    );
    info!("Audio factory at {}", config.audio.url);

    let thumbnail_api: Option<Arc<dyn RemoteJobApi>> = match &config.thumbnail {
        Some(thumbnail_config) => {
            let client = FactoryClient::new(thumbnail_config.clone())
                .context("Failed to create thumbnail factory client")?;
            info!("Thumbnail factory at {}", thumbnail_config.url);
            Some(Arc::new(client))
        }
        None => {
            info!("No thumbnail factory configured, using the placeholder thumbnail");
            None
        }
    };

    // Admission limiter and orchestrator
    let limiter = AdmissionLimiter::new(config.limiter.max_concurrent)
        .context("Failed to create admission limiter")?;
    info!(
        "Admission limiter: {} concurrent generations, {:?} policy",
        config.limiter.max_concurrent, config.generation.admission_policy
    );

    let orchestrator = PodcastOrchestrator::new(
        config.generation.clone(),
        limiter,
        Arc::new(InMemoryJobStore::new()),
        Arc::clone(&audio_api),
        thumbnail_api.clone(),
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create app state
    let state = Arc::new(AppState::new(
        config,
        orchestrator.clone(),
        audio_api,
        thumbnail_api,
    ));

    // Build router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Interrupt in-flight generations
    info!("Stopping orchestrator...");
    orchestrator.stop();

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
