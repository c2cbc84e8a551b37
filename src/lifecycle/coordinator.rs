//! Run coordination: accept until the first shutdown trigger, then drain
//! the registry exactly once.
//!
//! # Sequence
//! ```text
//! Running:
//!     spawn Acceptor
//!     first of { OS signal, run timeout, client "terminate" } records the
//!     cause and closes the listener
//! ShuttingDown:
//!     wait for accept loop → drain grace
//!     1. log every unique SKU (zero-trimmed) to the sink
//!     2. report unique / duplicate / invalid
//!     3. persist unique set → report inserted / skipped
//! Stopped:
//!     return the cause (or the persistence error)
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::MAX_CONNECTIONS;
use crate::config::ServerConfig;
use crate::lifecycle::shutdown::{Shutdown, ShutdownCause};
use crate::lifecycle::signals;
use crate::net::{Acceptor, AdmissionSlots, ConnectionContext};
use crate::observability::metrics;
use crate::sink::LogSink;
use crate::sku::{PersistOutcome, Report, SkuRegistry};
use crate::storage::{SkuStore, StoreError};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    #[error("max_connections must be between 1 and {max}, got {actual}")]
    ConnectionLimit { max: usize, actual: usize },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The run ended but the unique set could not be stored.
    #[error("persisting unique SKUs after {cause} shutdown failed: {source}")]
    Persist {
        cause: ShutdownCause,
        /// Counts computed before persistence was attempted.
        report: Report,
        #[source]
        source: StoreError,
    },
}

/// What a completed run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cause: ShutdownCause,
    pub report: Report,
    pub persisted: PersistOutcome,
    /// Entries written to the log sink.
    pub logged: usize,
}

/// Owns one run of the service.
pub struct ShutdownCoordinator {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<SkuRegistry>,
    sink: Arc<dyn LogSink>,
    store: Arc<dyn SkuStore>,
    shutdown: Shutdown,
}

impl ShutdownCoordinator {
    /// Bind the listening socket. Accepting starts with [`run`](Self::run).
    pub async fn bind(
        config: ServerConfig,
        registry: Arc<SkuRegistry>,
        sink: Arc<dyn LogSink>,
        store: Arc<dyn SkuStore>,
    ) -> Result<Self, ShutdownError> {
        if config.protocol != "tcp" {
            return Err(ShutdownError::UnsupportedProtocol(config.protocol.clone()));
        }
        if config.max_connections == 0 || config.max_connections > MAX_CONNECTIONS {
            return Err(ShutdownError::ConnectionLimit {
                max: MAX_CONNECTIONS,
                actual: config.max_connections,
            });
        }

        let listener = TcpListener::bind(config.bind_target())
            .await
            .map_err(|source| ShutdownError::Bind {
                address: format!("{}:{}", config.host, config.port),
                source,
            })?;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                protocol = %config.protocol,
                address = %addr,
                max_connections = config.max_connections,
                run_timeout_ms = config.run_timeout_ms,
                "Listening for connections"
            );
        }

        Ok(Self {
            config,
            listener,
            registry,
            sink,
            store,
            shutdown: Shutdown::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the run's shutdown trigger, as fired by `terminate`.
    pub fn terminate_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run until SIGINT/SIGTERM, the run timeout, or a client `terminate`.
    pub async fn run(self) -> Result<RunSummary, ShutdownError> {
        self.run_until(signals::wait_for_termination()).await
    }

    /// Like [`run`](Self::run) with `signal` standing in for OS signals.
    pub async fn run_until<F>(self, signal: F) -> Result<RunSummary, ShutdownError>
    where
        F: Future,
    {
        let Self {
            config,
            listener,
            registry,
            sink,
            store,
            shutdown,
        } = self;

        let slots = AdmissionSlots::new(config.max_connections);
        let context = ConnectionContext {
            registry: registry.clone(),
            terminate: shutdown.clone(),
            max_line_bytes: config.max_line_bytes,
        };
        // The first trigger also closes the listener.
        let accept_loop = tokio::spawn(
            Acceptor::new(listener, slots.clone(), context).run(shutdown.clone()),
        );

        // Whichever producer triggers first records the cause; the others are
        // absorbed, however this select happens to poll them.
        tokio::select! {
            _ = signal => {
                shutdown.trigger(ShutdownCause::Signal);
            }
            _ = tokio::time::sleep(config.run_timeout()) => {
                shutdown.trigger(ShutdownCause::Timeout);
            }
            _ = shutdown.triggered() => {}
        }
        let cause = shutdown.triggered().await;
        tracing::info!(cause = %cause, "Shutting down");
        metrics::record_shutdown(cause.as_str());

        match accept_loop.await {
            Ok(admitted) => tracing::debug!(admitted, "Accept loop stopped"),
            Err(e) => tracing::error!(error = %e, "Accept loop terminated abnormally"),
        }

        if !slots.wait_idle(config.drain_grace()).await {
            tracing::warn!(
                in_flight = slots.in_flight(),
                grace_ms = config.drain_grace_ms,
                "Connections still in flight after drain grace"
            );
        }

        stop(cause, &registry, sink.as_ref(), store.as_ref()).await
    }
}

/// The shutdown sequence. Runs once per run.
async fn stop(
    cause: ShutdownCause,
    registry: &SkuRegistry,
    sink: &dyn LogSink,
    store: &dyn SkuStore,
) -> Result<RunSummary, ShutdownError> {
    let logged = write_log(registry, sink);

    let report = registry.report();
    tracing::info!(
        unique = report.unique,
        duplicate = report.duplicate,
        invalid = report.invalid,
        "Run report"
    );

    let persisted = match registry.persist(store).await {
        Ok(persisted) => persisted,
        Err(source) => {
            tracing::error!(error = %source, "Persisting unique SKUs failed");
            return Err(ShutdownError::Persist {
                cause,
                report,
                source,
            });
        }
    };
    metrics::record_persisted(persisted.inserted);
    tracing::info!(
        inserted = persisted.inserted,
        skipped = persisted.skipped,
        "Unique SKUs persisted"
    );

    Ok(RunSummary {
        cause,
        report,
        persisted,
        logged,
    })
}

/// Write one entry per unique SKU. Sink failures are logged, never fatal.
fn write_log(registry: &SkuRegistry, sink: &dyn LogSink) -> usize {
    let mut written = 0;
    for sku in registry.drain_for_log() {
        match sink.append(&format!("Added sku: {}", sku.zero_trimmed())) {
            Ok(()) => written += 1,
            Err(e) => tracing::warn!(sku = %sku, error = %e, "Failed to write log entry"),
        }
    }
    if let Err(e) = sink.flush() {
        tracing::warn!(error = %e, "Failed to flush log sink");
    }
    written
}
