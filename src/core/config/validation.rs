//! Contains validation logic for the final Config struct.

use super::Config;
use crate::core::error::{AppError, Result};
use url::Url;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values or set defaults where applicable and logical.
/// Internal helper for the builder's `build` method.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.workers == 0 {
        tracing::warn!("Worker count was set to 0. Setting to 1.");
        config.workers = 1;
    }
    if config.queue_capacity == 0 {
        tracing::warn!("Queue capacity was set to 0. Setting to 1.");
        config.queue_capacity = 1;
    }
    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "Request timeout cannot be zero.".to_string(),
        ));
    }
    if config.client_version.trim().is_empty() {
        return Err(AppError::Config(
            "Client version header value cannot be empty.".to_string(),
        ));
    }

    for (label, value) in [
        ("search endpoint", &config.search_endpoint),
        ("presence endpoint", &config.presence_endpoint),
    ] {
        let url = Url::parse(value)
            .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", label, value, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "Invalid {} '{}': expected an http(s) URL",
                label, value
            )));
        }
    }

    // The search endpoint gets path segments appended to it.
    config.search_endpoint = config.search_endpoint.trim_end_matches('/').to_string();

    Ok(())
}
