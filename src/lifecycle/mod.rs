//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build store + sink → Create registry → Bind listener
//!
//! Run (coordinator.rs):
//!     Accept → first of { signal, timeout, terminate } → Close listener
//!     → Log → Report → Persist → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown cause "signal"
//! ```
//!
//! # Design Decisions
//! - Ordered startup: collaborators first, listener last
//! - Ordered shutdown: stop accept, drain, then read the registry
//! - Drain has a deadline: a stuck connection cannot hold shutdown

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::{RunSummary, ShutdownCoordinator, ShutdownError};
pub use shutdown::{Shutdown, ShutdownCause};
