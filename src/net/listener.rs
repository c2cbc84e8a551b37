//! TCP acceptor with admission control.
//!
//! # Responsibilities
//! - Accept incoming TCP connections
//! - Enforce `max_connections` via a semaphore of admission slots
//! - Reject (not queue) connections that arrive while every slot is taken
//! - Dispatch admitted connections to their own task
//!
//! # Design Decisions
//! - A slot is held by an RAII permit, so every exit path of a handler
//!   (including a panic) releases it exactly once
//! - The loop ends when the listener is closed or `accept` fails; in-flight
//!   handlers are never interrupted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionContext, ConnectionHandler, ConnectionId};
use crate::observability::metrics;

/// Sent to connections that arrive while every slot is taken.
///
/// After the message the write half is closed at once. Request bytes that
/// already arrived are discarded unparsed for at most [`REJECT_LINGER`], so
/// the socket closes with a FIN instead of a reset that could drop the
/// message before the client reads it.
pub const LIMIT_REACHED: &[u8] = b"limit connections reached\n";

/// Upper bound on how long a rejected socket stays open after the message.
pub const REJECT_LINGER: Duration = Duration::from_millis(100);

/// Bounded pool of admission slots.
#[derive(Debug, Clone)]
pub struct AdmissionSlots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot if one is free. Never waits.
    pub fn try_admit(&self) -> Option<ConnectionPermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        metrics::record_connection_opened();
        Some(ConnectionPermit { _permit: permit })
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held by connections.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait up to `grace` for every slot to be returned.
    ///
    /// Returns `true` if nothing was in flight when it resolved.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        matches!(
            tokio::time::timeout(grace, self.semaphore.acquire_many(all)).await,
            Ok(Ok(_))
        )
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the pool.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        metrics::record_connection_closed();
    }
}

/// Accept loop for one run.
pub struct Acceptor {
    listener: TcpListener,
    slots: AdmissionSlots,
    context: ConnectionContext,
}

impl Acceptor {
    pub fn new(listener: TcpListener, slots: AdmissionSlots, context: ConnectionContext) -> Self {
        Self {
            listener,
            slots,
            context,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept and dispatch until `close` fires or `accept` fails.
    ///
    /// The listening socket is closed when this returns. Returns the number
    /// of admitted connections.
    pub async fn run(self, close: Shutdown) -> u64 {
        let mut admitted = 0u64;

        loop {
            let accepted = tokio::select! {
                biased;
                _ = close.triggered() => {
                    tracing::info!("Listener closed, accept loop stopping");
                    break;
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, accept loop stopping");
                    break;
                }
            };

            match self.slots.try_admit() {
                Some(permit) => {
                    admitted += 1;
                    self.dispatch(stream, peer, permit);
                }
                None => {
                    tokio::spawn(reject(stream, peer));
                }
            }
        }

        admitted
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let id = ConnectionId::new();
        metrics::record_connection("accepted");
        tracing::debug!(
            connection_id = %id,
            peer_addr = %peer,
            available_slots = self.slots.available(),
            "Connection accepted"
        );

        let handler = ConnectionHandler::new(id, stream, self.context.clone());
        tokio::spawn(async move {
            match handler.run(permit).await {
                Ok(handled) => {
                    tracing::trace!(connection_id = %id, handled = ?handled, "Connection closed")
                }
                Err(e) => {
                    tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection dropped")
                }
            }
        });
    }
}

async fn reject(mut stream: TcpStream, peer: SocketAddr) {
    metrics::record_connection("rejected");
    tracing::warn!(peer_addr = %peer, "Concurrent connection limit reached");

    if let Err(e) = stream.write_all(LIMIT_REACHED).await {
        tracing::debug!(peer_addr = %peer, error = %e, "Failed to send limit message");
        return;
    }
    let _ = stream.shutdown().await;

    let mut sink = [0u8; 256];
    let _ = tokio::time::timeout(REJECT_LINGER, async {
        while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ShutdownCause;
    use crate::sku::SkuRegistry;

    #[test]
    fn slots_are_bounded() {
        let slots = AdmissionSlots::new(2);

        let first = slots.try_admit().unwrap();
        let second = slots.try_admit().unwrap();
        assert!(slots.try_admit().is_none());
        assert_eq!(slots.in_flight(), 2);

        drop(first);
        assert_eq!(slots.available(), 1);
        let third = slots.try_admit();
        assert!(third.is_some());

        drop(second);
        drop(third);
        assert_eq!(slots.available(), slots.capacity());
    }

    #[tokio::test]
    async fn wait_idle_resolves_when_slots_return() {
        let slots = AdmissionSlots::new(2);
        let permit = slots.try_admit().unwrap();

        assert!(!slots.wait_idle(Duration::from_millis(20)).await);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(permit);
        });
        assert!(slots.wait_idle(Duration::from_secs(2)).await);
        assert_eq!(slots.available(), 2);
    }

    #[tokio::test]
    async fn rejection_does_not_wait_for_a_silent_client() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();

        // The client never sends a line and never hangs up.
        tokio::time::timeout(REJECT_LINGER + Duration::from_millis(500), reject(server, peer))
            .await
            .expect("rejected socket held open past the linger");

        let mut reply = Vec::new();
        client.read_to_end(&mut reply).await.unwrap();
        assert_eq!(reply, LIMIT_REACHED);
    }

    #[tokio::test]
    async fn close_stops_the_loop_and_the_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let context = ConnectionContext {
            registry: Arc::new(SkuRegistry::new()),
            terminate: Shutdown::new(),
            max_line_bytes: 64,
        };
        let acceptor = Acceptor::new(listener, AdmissionSlots::new(1), context);
        let addr = acceptor.local_addr().unwrap();

        let close = Shutdown::new();
        let task = tokio::spawn(acceptor.run(close.clone()));
        close.trigger(ShutdownCause::Signal);

        let admitted = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admitted, 0);
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
