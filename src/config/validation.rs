use crate::config::types::{
    CheckpointConfig, Config, FetchConfig, OutputConfig, RangeConfig, SourceConfig,
    ThrottleConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_range_config(&config.range)?;
    validate_fetch_config(&config.fetch)?;
    validate_throttle_config(&config.throttle)?;
    validate_checkpoint_config(&config.checkpoint)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the listing source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if url.query_pairs().any(|(key, _)| key == "page") {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must not carry a page parameter",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates the default page range
fn validate_range_config(config: &RangeConfig) -> Result<(), ConfigError> {
    validate_page_range(config.start_page, config.end_page)
}

/// Checks that a page range is non-empty and starts at page 1 or later
pub fn validate_page_range(start: u32, end: u32) -> Result<(), ConfigError> {
    if start < 1 {
        return Err(ConfigError::Validation(format!(
            "start_page must be >= 1, got {}",
            start
        )));
    }

    if end < start {
        return Err(ConfigError::Validation(format!(
            "end_page ({}) must not be lower than start_page ({})",
            end, start
        )));
    }

    Ok(())
}

/// Validates fetcher retry settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.jitter_min_ms > config.jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
            config.jitter_min_ms, config.jitter_max_ms
        )));
    }

    Ok(())
}

/// Validates the inter-page delay window
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates checkpoint settings
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint path cannot be empty".to_string(),
        ));
    }

    if config.interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint interval must be >= 1, got {}",
            config.interval
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.debug_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "debug directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty()
        || config
            .file_prefix
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(ConfigError::Validation(format!(
            "file_prefix must be a non-empty name without separators or spaces, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}
