//! Append-only log sinks.
//!
//! The shutdown sequence writes one entry per unique SKU here. Sinks never
//! need to be read back by the service.

pub mod file;

use std::io;
use std::sync::{Mutex, PoisonError};

pub use file::FileSink;

/// Append-only destination for text entries.
pub trait LogSink: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: &str) -> io::Result<()>;

    /// Push buffered entries to their destination.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry appended so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn append(&self, entry: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.to_string());
        Ok(())
    }
}
