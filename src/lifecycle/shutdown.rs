//! Shutdown triggers and causes.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Idempotent one-shot trigger shared between tasks.
///
/// Any number of producers may call [`Shutdown::trigger`]; only the first
/// call records its cause, later calls are absorbed. Waiters that subscribe
/// after the trigger still observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownCause>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the trigger with `cause`. Returns `true` only for the call that
    /// fired it.
    pub fn trigger(&self, cause: ShutdownCause) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                false
            } else {
                *slot = Some(cause);
                true
            }
        })
    }

    /// The cause recorded by the first trigger, if any.
    pub fn cause(&self) -> Option<ShutdownCause> {
        *self.tx.borrow()
    }

    pub fn is_triggered(&self) -> bool {
        self.cause().is_some()
    }

    /// Resolve with the recorded cause once the trigger has fired.
    pub async fn triggered(&self) -> ShutdownCause {
        let mut rx = self.tx.subscribe();
        // The sender lives inside `self`, so the channel never closes here.
        let cause = match rx.wait_for(Option::is_some).await {
            Ok(slot) => *slot,
            Err(_) => None,
        };
        match cause {
            Some(cause) => cause,
            None => std::future::pending().await,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of the three triggers ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// SIGINT or SIGTERM.
    Signal,
    /// The configured run timeout elapsed.
    Timeout,
    /// A client sent `terminate`.
    ClientTerminate,
}

impl ShutdownCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownCause::Signal => "signal",
            ShutdownCause::Timeout => "timeout",
            ShutdownCause::ClientTerminate => "client_terminate",
        }
    }

    /// Process exit code for this cause.
    pub fn exit_code(&self) -> u8 {
        match self {
            ShutdownCause::ClientTerminate | ShutdownCause::Timeout => 0,
            ShutdownCause::Signal => 130,
        }
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
