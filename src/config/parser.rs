use crate::config::types::Config;
use crate::ConfigError;
use std::path::Path;
use url::Url;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Validates the parsed configuration
///
/// Checks that numeric knobs are in usable ranges and that every seed URL
/// actually parses, so a bad config fails at load time instead of mid-crawl.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.engine.max_concurrent_fetches == 0 {
        return Err(ConfigError::Validation(
            "max-concurrent-fetches must be greater than 0".to_string(),
        ));
    }

    if config.engine.heartbeat_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "heartbeat-interval-ms must be greater than 0".to_string(),
        ));
    }

    if config.engine.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.user_agent.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name must not be empty".to_string(),
        ));
    }

    for entry in &config.seed {
        Url::parse(&entry.url).map_err(|_| ConfigError::InvalidUrl(entry.url.clone()))?;
    }

    Ok(())
}
