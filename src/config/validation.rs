use crate::config::types::{Config, CrawlerConfig, RetryConfig, TargetConfig, UserAgentConfig};
use crate::config::OutputConfig;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_retry_config(&config.retry)?;
    validate_target_config(&config.target)?;
    validate_output_config(&config.output)?;

    if config.timeouts.connect_secs == 0 || config.timeouts.read_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 100, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.progress_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "progress_interval_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let identity = config.crawler_identity.trim();
    if identity.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_identity cannot be empty".to_string(),
        ));
    }

    // Must be representable as a header value
    if identity.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(format!(
            "crawler_identity must not contain control characters, got '{}'",
            config.crawler_identity.escape_default()
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 20, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates the harvest target
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let site = Url::parse(&config.site)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site '{}': {}", config.site, e)))?;

    if !matches!(site.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "site '{}' must use http or https",
            config.site
        )));
    }

    if site.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "site '{}' has no host",
            config.site
        )));
    }

    if config.sitemap_filter.is_empty() {
        return Err(ConfigError::Validation(
            "sitemap_filter cannot be empty".to_string(),
        ));
    }

    for host in &config.whitelist {
        validate_host(host)?;
    }

    Url::parse(&config.asset_prefix).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid asset_prefix '{}': {}",
            config.asset_prefix, e
        ))
    })?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.assets_dir.is_empty() {
        return Err(ConfigError::Validation(
            "assets_dir cannot be empty".to_string(),
        ));
    }

    if config.metadata_path.is_empty() {
        return Err(ConfigError::Validation(
            "metadata_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a whitelisted host, optionally carrying a port
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation(
            "Whitelisted host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        return Err(ConfigError::Validation(format!(
            "Whitelisted host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Whitelisted host '{}' is malformed",
            host
        )));
    }

    Ok(())
}
