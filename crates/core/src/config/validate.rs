use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one client is configured
/// - Client URLs are non-empty http(s) URLs
/// - Category scopes are not empty strings
/// - Executor limits are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.clients.is_empty() {
        return Err(ConfigError::ValidationError(
            "no clients configured".to_string(),
        ));
    }

    for (name, client) in &config.clients {
        if client.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "clients.{}.url cannot be empty",
                name
            )));
        }
        if !client.url.starts_with("http://") && !client.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "clients.{}.url must start with http:// or https://",
                name
            )));
        }
        if matches!(&client.category, Some(c) if c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "clients.{}.category cannot be empty, omit it instead",
                name
            )));
        }
    }

    if config.executor.max_concurrent_targets == 0 {
        return Err(ConfigError::ValidationError(
            "executor.max_concurrent_targets cannot be 0".to_string(),
        ));
    }
    if config.executor.max_concurrent_items == 0 {
        return Err(ConfigError::ValidationError(
            "executor.max_concurrent_items cannot be 0".to_string(),
        ));
    }

    Ok(())
}
