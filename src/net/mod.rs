//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, admission slots)
//!         ├─ no slot: "limit connections reached\n", close
//!         └─ slot:    spawn handler
//!     → connection.rs (one line → registry or terminate, "OK\n", close)
//!
//! Connection States:
//!     AwaitingLine → Dispatched → Closed
//! ```
//!
//! # Design Decisions
//! - Admission is reject-not-queue; slots are the only backpressure
//! - One request per connection
//! - client.rs speaks the same protocol for the CLI and tests

pub mod client;
pub mod connection;
pub mod listener;

pub use connection::{ConnectionContext, ConnectionHandler, ConnectionId, ConnectionState};
pub use listener::{Acceptor, AdmissionSlots, ConnectionPermit};
