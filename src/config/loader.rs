//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::FeederConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "SVC_PORT";
pub const ENV_HOST: &str = "FEEDER_HOST";
pub const ENV_RUN_TIMEOUT_MS: &str = "FEEDER_RUN_TIMEOUT_MS";
pub const ENV_MAX_CONNECTIONS: &str = "FEEDER_MAX_CONNECTIONS";
pub const ENV_STORE_PATH: &str = "FEEDER_STORE_PATH";
pub const ENV_LOG_DIR: &str = "FEEDER_LOG_DIR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    Override { key: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn parse_config(path: &Path) -> Result<FeederConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load the file (or defaults when `path` is `None`) and apply environment
/// overrides from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<FeederConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(path)?,
        None => FeederConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay environment values onto `config`.
///
/// `lookup` resolves a variable name to its value.
pub fn apply_env_overrides<F>(config: &mut FeederConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup(ENV_PORT) {
        config.server.port = parse_override(ENV_PORT, port)?;
    }
    if let Some(host) = lookup(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(timeout) = lookup(ENV_RUN_TIMEOUT_MS) {
        config.server.run_timeout_ms = parse_override(ENV_RUN_TIMEOUT_MS, timeout)?;
    }
    if let Some(max) = lookup(ENV_MAX_CONNECTIONS) {
        config.server.max_connections = parse_override(ENV_MAX_CONNECTIONS, max)?;
    }
    if let Some(path) = lookup(ENV_STORE_PATH) {
        config.storage.path = path;
    }
    if let Some(dir) = lookup(ENV_LOG_DIR) {
        config.sink.directory = dir;
    }
    Ok(())
}

fn parse_override<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Override { key, value })
}

/// Reject a configuration with semantic problems.
pub fn ensure_valid(config: &FeederConfig) -> Result<(), ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)
}
