use crate::config::types::{Config, EngineConfig, UserAgentConfig, MAX_WORKERS};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates pool sizes and the per-host ceiling
///
/// Called by the engine constructor as well, so a bad configuration fails
/// before any worker is started.
pub fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    validate_worker_count("fetch_workers", config.fetch_workers)?;
    validate_worker_count("extract_workers", config.extract_workers)?;

    if config.per_host == Some(0) {
        return Err(ConfigError::Validation(
            "per_host must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_worker_count(name: &str, count: usize) -> Result<(), ConfigError> {
    if count < 1 || count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_WORKERS, count
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}
