//! SKU Feeder Library
//!
//! A line-oriented TCP service that collects SKUs from short-lived client
//! connections, deduplicates them for one run, and persists the unique set
//! on shutdown.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod sink;
pub mod sku;
pub mod storage;

pub use config::FeederConfig;
pub use lifecycle::{RunSummary, ShutdownCause, ShutdownCoordinator, ShutdownError};
pub use sku::{Sku, SkuError, SkuRegistry};
