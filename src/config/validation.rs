//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0 and within the semaphore's range, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: FeederConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::{FeederConfig, StorageBackend};

/// Smallest line that fits one SKU plus `\r\n`.
pub const MIN_LINE_BYTES: usize = 11;

/// Largest connection limit the admission slots can represent.
pub const MAX_CONNECTIONS: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported protocol '{0}', only 'tcp' is available")]
    UnsupportedProtocol(String),

    #[error("server.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("server.max_connections must be at most {max}, got {actual}")]
    MaxConnectionsTooLarge { max: usize, actual: usize },

    #[error("server.run_timeout_ms must be greater than zero")]
    ZeroRunTimeout,

    #[error("server.max_line_bytes must be at least {min}, got {actual}")]
    LineLimitTooSmall { min: usize, actual: usize },

    #[error("storage.path is required for the file backend")]
    MissingStorePath,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem.
pub fn validate_config(config: &FeederConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let server = &config.server;

    if server.protocol != "tcp" {
        errors.push(ValidationError::UnsupportedProtocol(server.protocol.clone()));
    }
    if server.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if server.max_connections > MAX_CONNECTIONS {
        errors.push(ValidationError::MaxConnectionsTooLarge {
            max: MAX_CONNECTIONS,
            actual: server.max_connections,
        });
    }
    if server.run_timeout_ms == 0 {
        errors.push(ValidationError::ZeroRunTimeout);
    }
    if server.max_line_bytes < MIN_LINE_BYTES {
        errors.push(ValidationError::LineLimitTooSmall {
            min: MIN_LINE_BYTES,
            actual: server.max_line_bytes,
        });
    }
    if config.storage.backend == StorageBackend::File && config.storage.path.trim().is_empty() {
        errors.push(ValidationError::MissingStorePath);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
