//! Per-connection protocol handling.
//!
//! # Responsibilities
//! - Read exactly one `\n`-terminated line
//! - Route `terminate` to the shutdown trigger, anything else to the registry
//! - Acknowledge with `OK\n` and close
//! - Release the admission slot on every path
//!
//! # State Machine
//! ```text
//! AwaitingLine ──line──▶ Dispatched ──ack──▶ Closed
//!      │                                       ▲
//!      └──────── EOF / I/O error / too long ───┘   (no ack)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::lifecycle::{Shutdown, ShutdownCause};
use crate::net::listener::ConnectionPermit;
use crate::sku::{AddOutcome, SkuRegistry};

/// Reply sent after every processed line.
pub const ACK: &[u8] = b"OK\n";

/// Line that asks the server to shut down.
pub const TERMINATE_COMMAND: &str = "terminate";

/// Using relaxed ordering is sufficient since we only need uniqueness.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the single request line.
    AwaitingLine,
    /// The line has been routed; acknowledgement pending.
    Dispatched,
    /// Connection torn down.
    Closed,
}

/// Why a connection ended without a processed line.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("client disconnected before sending a full line")]
    Disconnected,

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("acknowledgement failed: {0}")]
    Write(#[source] std::io::Error),
}

/// What the connection's line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// The shutdown command. `first` is true if this connection fired it.
    Terminate { first: bool },
    /// A candidate SKU went to the registry.
    Sku(AddOutcome),
}

/// Everything a handler needs besides its stream.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub registry: Arc<SkuRegistry>,
    /// Explicit-command shutdown trigger.
    pub terminate: Shutdown,
    pub max_line_bytes: usize,
}

/// Serves the single request of one accepted connection.
pub struct ConnectionHandler<S> {
    id: ConnectionId,
    stream: S,
    context: ConnectionContext,
    state: ConnectionState,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: ConnectionId, stream: S, context: ConnectionContext) -> Self {
        Self {
            id,
            stream,
            context,
            state: ConnectionState::AwaitingLine,
        }
    }

    /// Handle the connection to completion, then release `permit`.
    pub async fn run(mut self, permit: ConnectionPermit) -> Result<Handled, ConnectionError> {
        let result = self.serve().await;
        let _ = self.stream.shutdown().await;
        self.transition(ConnectionState::Closed);
        drop(permit);
        result
    }

    async fn serve(&mut self) -> Result<Handled, ConnectionError> {
        let line = self.read_line().await?;
        self.transition(ConnectionState::Dispatched);

        if line == TERMINATE_COMMAND {
            // Acknowledge before initiating shutdown; fire even if the ack fails.
            let acked = self.acknowledge().await;
            let first = self
                .context
                .terminate
                .trigger(ShutdownCause::ClientTerminate);
            tracing::info!(connection_id = %self.id, first, "Client requested terminate");
            acked?;
            return Ok(Handled::Terminate { first });
        }

        let outcome = self.context.registry.add(&line);
        match &outcome {
            AddOutcome::Invalid(e) => {
                tracing::debug!(connection_id = %self.id, line = %line, reason = e.as_str(), "Invalid SKU")
            }
            other => {
                tracing::debug!(connection_id = %self.id, outcome = other.as_str(), "SKU received")
            }
        }

        self.acknowledge().await?;
        Ok(Handled::Sku(outcome))
    }

    async fn read_line(&mut self) -> Result<String, ConnectionError> {
        let limit = self.context.max_line_bytes;
        let mut reader = BufReader::new(&mut self.stream).take(limit as u64);
        let mut buf = Vec::new();

        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(ConnectionError::Read)?;

        if buf.last() != Some(&b'\n') {
            return Err(if read >= limit {
                ConnectionError::LineTooLong { limit }
            } else {
                ConnectionError::Disconnected
            });
        }

        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn acknowledge(&mut self) -> Result<(), ConnectionError> {
        self.stream.write_all(ACK).await.map_err(ConnectionError::Write)?;
        self.stream.flush().await.map_err(ConnectionError::Write)
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(connection_id = %self.id, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }
}
