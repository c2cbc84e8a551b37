//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT (Ctrl+C) and, on unix, SIGTERM handlers
//! - Resolve once either arrives
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A handler that cannot be installed never fires, so the run still ends
//!   through the timeout or the client command

use std::future::pending;

/// Wait for an interrupt or termination signal. Returns the signal name.
pub async fn wait_for_termination() -> &'static str {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                pending::<&'static str>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                pending::<&'static str>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<&'static str>();

    let name = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    tracing::info!(signal = name, "Termination signal received");
    name
}
