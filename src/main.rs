//! SKU Feeder (v1)
//!
//! Collects SKUs over TCP for one run and persists the unique set.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   SKU FEEDER                     │
//!                    │                                                  │
//!  Client line       │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!  ──────────────────┼─▶│ Acceptor │──▶│ Connection │──▶│    Sku     │  │
//!                    │  │  (slots) │   │  Handler   │   │  Registry  │  │
//!  "OK" / "limit"    │  └──────────┘   └─────┬──────┘   └─────┬──────┘  │
//!  ◀─────────────────┼──────────────────────┘ terminate       │ drain   │
//!                    │                        ▼                ▼         │
//!  SIGINT/SIGTERM ───┼──────────────▶ ┌──────────────┐  ┌────────────┐   │
//!  run timeout ──────┼──────────────▶ │   Shutdown   │─▶│ log sink,  │   │
//!                    │                │ Coordinator  │  │ report,    │   │
//!                    │                └──────────────┘  │ store      │   │
//!                    │                                  └────────────┘   │
//!                    └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use sku_feeder::config::{loader, FeederConfig, StorageBackend};
use sku_feeder::lifecycle::startup;
use sku_feeder::observability::{logging, metrics};
use sku_feeder::ShutdownCause;

#[derive(Parser)]
#[command(name = "sku-feeder")]
#[command(about = "Collect SKUs over TCP and persist the unique set on shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host (empty for every interface).
    #[arg(long)]
    host: Option<String>,

    /// Listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Run timeout in milliseconds.
    #[arg(long)]
    run_timeout_ms: Option<u64>,

    /// Maximum concurrent connections.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Keep unique SKUs in memory only.
    #[arg(long)]
    memory: bool,
}

impl Cli {
    fn apply(&self, config: &mut FeederConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(timeout) = self.run_timeout_ms {
            config.server.run_timeout_ms = timeout;
        }
        if let Some(max) = self.max_connections {
            config.server.max_connections = max;
        }
        if self.memory {
            config.storage.backend = StorageBackend::Memory;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(cause) => ExitCode::from(cause.exit_code()),
        Err(e) => {
            tracing::error!(error = %e, "Feeder stopped with an error");
            eprintln!("sku-feeder: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ShutdownCause, Box<dyn std::error::Error>> {
    let mut config = loader::load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    loader::ensure_valid(&config)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("sku-feeder v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let coordinator = startup::start(&config).await?;
    let summary = coordinator.run().await?;

    tracing::info!(
        cause = %summary.cause,
        unique = summary.report.unique,
        duplicate = summary.report.duplicate,
        invalid = summary.report.invalid,
        inserted = summary.persisted.inserted,
        skipped = summary.persisted.skipped,
        "Shutdown complete"
    );
    Ok(summary.cause)
}
