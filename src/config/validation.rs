use crate::config::types::{Config, CoordinatorConfig, UserAgentConfig, WorkerConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_coordinator_config(&config.coordinator)?;
    validate_worker_config(&config.worker)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_coordinator_config(config: &CoordinatorConfig) -> Result<(), ConfigError> {
    if config.task_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "task-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sweep-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.sweep_interval_secs > config.task_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "sweep-interval-secs ({}) must not exceed task-timeout-secs ({})",
            config.sweep_interval_secs, config.task_timeout_secs
        )));
    }

    if config.liveness_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "liveness-interval-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.robots_fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "robots-fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.heartbeat_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "heartbeat-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    if !config.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "contact-email must contain '@', got '{}'",
            config.contact_email
        )));
    }

    Ok(())
}
