//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides)
//!     → command-line overrides (binary)
//!     → validation.rs (semantic checks)
//!     → FeederConfig (validated, immutable for the run)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the run starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    FeederConfig, ObservabilityConfig, ServerConfig, SinkConfig, StorageBackend, StorageConfig,
};
pub use validation::{validate_config, ValidationError};
