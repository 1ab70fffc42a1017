use crate::config::types::{Config, CrawlerConfig, DownloadConfig, FilterEntry, PortalConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound on concurrently handled targets
const MAX_THREADS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_portal_config(&config.portal)?;
    validate_crawler_config(&config.crawler)?;
    validate_download_config(&config.download)?;
    validate_filters(&config.filters)?;
    Ok(())
}

/// Validates portal URLs
fn validate_portal_config(config: &PortalConfig) -> Result<(), ConfigError> {
    let root = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root-url '{}': {}", config.root_url, e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "root-url '{}' must use HTTP or HTTPS",
            config.root_url
        )));
    }

    if root.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "root-url '{}' has no host",
            config.root_url
        )));
    }

    if let Some(login) = &config.login_url {
        root.join(login)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid login-url '{}': {}", login, e)))?;
    }

    if config.courses_endpoint.is_empty() {
        return Err(ConfigError::Validation(
            "courses-endpoint cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.threads < 1 || config.threads > MAX_THREADS {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and {}, got {}",
            MAX_THREADS, config.threads
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(
            "retries must be >= 1".to_string(),
        ));
    }

    if config.idle_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "idle-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the download target
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download directory cannot be empty".to_string(),
        ));
    }

    if config.max_file_size_mb.is_nan() || config.max_file_size_mb <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "max-file-size-mb must be positive, got {}",
            config.max_file_size_mb
        )));
    }

    Ok(())
}

/// Every filter pattern must compile as a regular expression
fn validate_filters(filters: &[FilterEntry]) -> Result<(), ConfigError> {
    for entry in filters {
        if entry.pattern.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Filter pattern cannot be empty".to_string(),
            ));
        }

        Regex::new(&entry.pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("'{}': {}", entry.pattern, e))
        })?;
    }

    Ok(())
}
