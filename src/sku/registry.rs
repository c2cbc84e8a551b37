//! Concurrent, run-scoped SKU registry.
//!
//! # Responsibilities
//! - Validate and normalize every submitted line
//! - Keep exactly one entry per canonical SKU
//! - Count duplicates and invalid inputs
//! - Hand the unique set to the log sink and the persistence backend
//!
//! # Design Decisions
//! - Parsing runs outside the lock (it touches no shared state)
//! - One mutex guards the map and both counters, so every `add` is a single
//!   check-and-insert step and `report` never observes a half-applied add
//! - The container is never exposed; callers only get coarse operations

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::observability::metrics;
use crate::sku::{Sku, SkuError};
use crate::storage::{SkuStore, StoreError};

/// What happened to a submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// First time this SKU was seen in the run.
    Added(Sku),
    /// The SKU was already registered.
    Duplicate(Sku),
    /// The line failed validation.
    Invalid(SkuError),
}

impl AddOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddOutcome::Added(_) => "added",
            AddOutcome::Duplicate(_) => "duplicate",
            AddOutcome::Invalid(_) => "invalid",
        }
    }
}

/// Point-in-time counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub unique: u64,
    pub duplicate: u64,
    pub invalid: u64,
}

/// Result of handing the unique set to a [`SkuStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Newly written by the backend.
    pub inserted: u64,
    /// Already present in the backend from an earlier run.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Inner {
    unique: HashMap<String, Sku>,
    duplicate: u64,
    invalid: u64,
}

/// In-memory store of the unique SKUs seen during one run.
#[derive(Debug, Default)]
pub struct SkuRegistry {
    inner: Mutex<Inner>,
}

impl SkuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit one raw line.
    pub fn add(&self, raw: &str) -> AddOutcome {
        let parsed = Sku::parse(raw);

        let outcome = {
            let mut inner = self.lock();
            match parsed {
                Err(e) => {
                    inner.invalid += 1;
                    AddOutcome::Invalid(e)
                }
                Ok(sku) => {
                    if inner.unique.contains_key(sku.as_str()) {
                        inner.duplicate += 1;
                        AddOutcome::Duplicate(sku)
                    } else {
                        inner.unique.insert(sku.as_str().to_string(), sku.clone());
                        AddOutcome::Added(sku)
                    }
                }
            }
        };

        metrics::record_sku(outcome.as_str());
        outcome
    }

    /// Counts of unique, duplicate and invalid submissions so far.
    pub fn report(&self) -> Report {
        let inner = self.lock();
        Report {
            unique: inner.unique.len() as u64,
            duplicate: inner.duplicate,
            invalid: inner.invalid,
        }
    }

    /// Every unique SKU, in no particular order.
    pub fn drain_for_log(&self) -> Vec<Sku> {
        self.lock().unique.values().cloned().collect()
    }

    /// Hand the unique set to `store` in a single batch.
    ///
    /// An empty registry never reaches the backend.
    pub async fn persist(&self, store: &dyn SkuStore) -> Result<PersistOutcome, StoreError> {
        let batch = self.drain_for_log();
        if batch.is_empty() {
            return Ok(PersistOutcome::default());
        }

        let total = batch.len() as u64;
        let inserted = store.persist_batch(&batch).await?;

        Ok(PersistOutcome {
            inserted,
            skipped: total.saturating_sub(inserted),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Each critical section is a single step, so a poisoned guard still
        // holds consistent counts.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
