pub mod artifacts;
pub mod handlers;
pub mod middleware;
pub mod podcasts;
pub mod routes;

pub use routes::create_router;

use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
