//! HTTP surface for the podcast generation service.

pub mod api;
pub mod metrics;
pub mod state;
