use reqwest::Url;

use super::{types::Config, ConfigError, FactoryConfig};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Limiter capacity and poll budget are at least 1
/// - Factory URLs are absolute http(s) URLs with a bearer token
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.limiter.max_concurrent < 1 {
        return Err(ConfigError::ValidationError(
            "limiter.max_concurrent must be at least 1".to_string(),
        ));
    }

    if config.generation.max_poll_attempts < 1 {
        return Err(ConfigError::ValidationError(
            "generation.max_poll_attempts must be at least 1".to_string(),
        ));
    }

    if config.generation.poll_interval_ms < 1 {
        return Err(ConfigError::ValidationError(
            "generation.poll_interval_ms must be at least 1".to_string(),
        ));
    }

    validate_factory("audio", &config.audio)?;
    if let Some(thumbnail) = &config.thumbnail {
        validate_factory("thumbnail", thumbnail)?;
    }

    Ok(())
}

fn validate_factory(section: &str, factory: &FactoryConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&factory.url).map_err(|e| {
        ConfigError::ValidationError(format!("{}.url is not a valid URL: {}", section, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::ValidationError(format!(
            "{}.url must use http or https, got {}",
            section,
            url.scheme()
        )));
    }

    if factory.bearer_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{}.bearer_token cannot be empty",
            section
        )));
    }

    Ok(())
}
