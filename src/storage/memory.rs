//! In-process store.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{SkuStore, StoreError};
use crate::sku::Sku;

/// A [`SkuStore`] that keeps canonical strings in memory.
///
/// Contents live as long as the value does, so this backend suits embedding
/// and tests rather than cross-run deduplication.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashSet<String>>,
    round_trips: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous run had persisted these.
    pub fn with_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: Mutex::new(rows.into_iter().map(Into::into).collect()),
            round_trips: AtomicU64::new(0),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(canonical)
    }

    /// How many non-empty batches reached the store.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkuStore for MemoryStore {
    async fn persist_batch(&self, skus: &[Sku]) -> Result<u64, StoreError> {
        if skus.is_empty() {
            return Ok(0);
        }
        self.round_trips.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let inserted = skus
            .iter()
            .filter(|sku| rows.insert(sku.as_str().to_string()))
            .count();
        Ok(inserted as u64)
    }

    async fn delete_batch(&self, skus: &[Sku]) -> Result<u64, StoreError> {
        if skus.is_empty() {
            return Ok(0);
        }
        self.round_trips.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let deleted = skus.iter().filter(|sku| rows.remove(sku.as_str())).count();
        Ok(deleted as u64)
    }
}
