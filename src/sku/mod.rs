//! SKU domain.
//!
//! # Data Flow
//! ```text
//! raw line
//!     → value.rs (clean → validate → normalize)
//!     → registry.rs (dedupe under one lock, count duplicates/invalid)
//!     → on shutdown: log sink, report, persistence backend
//! ```

pub mod registry;
pub mod value;

pub use registry::{AddOutcome, PersistOutcome, Report, SkuRegistry};
pub use value::{Sku, SkuError};
