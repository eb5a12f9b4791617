use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{artifacts, handlers, middleware::metrics_middleware, podcasts};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Static files (placeholder thumbnail, front-end) path (configurable via env)
    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string());

    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Podcasts
        .route("/podcasts", post(podcasts::create_podcast))
        .route("/podcasts/stats", get(podcasts::get_stats))
        .route("/podcasts/stats/capacity", put(podcasts::set_capacity))
        .route("/podcasts/{id}", get(podcasts::get_podcast))
        // Artifact proxies
        .route("/audio/{location}", get(artifacts::get_audio))
        .route("/thumbnail/{location}", get(artifacts::get_thumbnail))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
