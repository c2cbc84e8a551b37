//! Persistence backends for unique SKUs.
//!
//! # Contract
//! ```text
//! persist_batch(skus) → rows inserted   (insert-if-absent, idempotent)
//! delete_batch(skus)  → rows deleted
//! ```
//!
//! Both operations return `0` for an empty batch without touching the
//! backend. A single attempt is made per call; callers decide what a failure
//! means.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::sku::Sku;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors raised by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded.
    #[error("corrupt store at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Rows could not be serialized for writing.
    #[error("failed to encode store for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused or failed the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A durable set of canonical SKUs.
#[async_trait]
pub trait SkuStore: Send + Sync {
    /// Insert every SKU not already present. Returns how many were new.
    async fn persist_batch(&self, skus: &[Sku]) -> Result<u64, StoreError>;

    /// Remove every listed SKU that is present. Returns how many were removed.
    async fn delete_batch(&self, skus: &[Sku]) -> Result<u64, StoreError>;
}
