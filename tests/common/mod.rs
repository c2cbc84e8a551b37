//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sku_feeder::config::ServerConfig;
use sku_feeder::lifecycle::Shutdown;
use sku_feeder::net::client::send_line_timeout;
use sku_feeder::sink::MemorySink;
use sku_feeder::storage::{MemoryStore, SkuStore};
use sku_feeder::{RunSummary, ShutdownCoordinator, ShutdownError, SkuRegistry};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// A server running on an ephemeral port with in-memory collaborators.
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<SkuRegistry>,
    pub sink: Arc<MemorySink>,
    pub store: Arc<MemoryStore>,
    pub terminate: Shutdown,
    signal: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<RunSummary, ShutdownError>>,
}

pub fn server_config(max_connections: usize, run_timeout_ms: u64) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        run_timeout_ms,
        max_connections,
        drain_grace_ms: 100,
        ..ServerConfig::default()
    }
}

pub async fn start_server(max_connections: usize, run_timeout_ms: u64) -> TestServer {
    start_with_store(
        server_config(max_connections, run_timeout_ms),
        Arc::new(MemoryStore::new()),
    )
    .await
}

pub async fn start_with_store(config: ServerConfig, store: Arc<MemoryStore>) -> TestServer {
    let registry = Arc::new(SkuRegistry::new());
    let sink = Arc::new(MemorySink::new());

    let coordinator = ShutdownCoordinator::bind(config, registry.clone(), sink.clone(), store.clone())
        .await
        .unwrap();
    let addr = coordinator.local_addr().unwrap();
    let terminate = coordinator.terminate_handle();

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(coordinator.run_until(async move {
        // A dropped sender is not a signal.
        if signal_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }));

    TestServer {
        addr,
        registry,
        sink,
        store,
        terminate,
        signal: Some(signal_tx),
        handle,
    }
}

impl TestServer {
    /// Simulate SIGINT/SIGTERM.
    pub fn send_signal(&mut self) {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(());
        }
    }

    pub async fn send(&self, line: &str) -> String {
        send_line_timeout(self.addr, line, REPLY_TIMEOUT).await.unwrap()
    }

    /// Send `line`, retrying while the server answers with the limit message.
    pub async fn send_admitted(&self, line: &str) -> String {
        for _ in 0..200 {
            let reply = self.send(line).await;
            if reply != "limit connections reached" {
                return reply;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never admitted: {line}");
    }

    /// Wait for the run to end.
    pub async fn finish(self) -> Result<RunSummary, ShutdownError> {
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not shut down")
            .expect("coordinator task panicked")
    }
}
