//! Startup orchestration.
//!
//! # Responsibilities
//! - Construct the persistence backend and the log sink from configuration
//! - Create the run's registry
//! - Bind the listener (traffic only once everything else is ready)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Collaborators are passed explicitly, never reached through globals

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{FeederConfig, SinkConfig, StorageBackend, StorageConfig};
use crate::lifecycle::coordinator::{ShutdownCoordinator, ShutdownError};
use crate::sink::{FileSink, LogSink};
use crate::sku::SkuRegistry;
use crate::storage::{JsonFileStore, MemoryStore, SkuStore};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open log sink in '{directory}': {source}")]
    Sink {
        directory: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ShutdownError),
}

/// Construct the configured persistence backend.
pub fn build_store(config: &StorageConfig) -> Arc<dyn SkuStore> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, unique SKUs will not outlive the run");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            tracing::info!(path = %config.path, "Using JSON file storage");
            Arc::new(JsonFileStore::new(&config.path))
        }
    }
}

/// Open this run's log file.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn LogSink>, StartupError> {
    let sink = FileSink::for_run(Path::new(&config.directory)).map_err(|source| {
        StartupError::Sink {
            directory: config.directory.clone(),
            source,
        }
    })?;
    tracing::info!(path = %sink.path().display(), "Run log opened");
    Ok(Arc::new(sink))
}

/// Wire every collaborator and bind the listener.
pub async fn start(config: &FeederConfig) -> Result<ShutdownCoordinator, StartupError> {
    let store = build_store(&config.storage);
    let sink = build_sink(&config.sink)?;
    let registry = Arc::new(SkuRegistry::new());

    let coordinator =
        ShutdownCoordinator::bind(config.server.clone(), registry, sink, store).await?;
    Ok(coordinator)
}
