//! JSON file store.
//!
//! The file holds a sorted JSON array of canonical SKUs. Every batch is a
//! read-merge-rewrite cycle; the rewrite goes through a sibling temporary
//! file and a rename so a crash never leaves a half-written store.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{SkuStore, StoreError};
use crate::sku::Sku;

/// A [`SkuStore`] backed by a JSON file on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-merge-rewrite cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored SKU. A missing file is an empty store.
    pub async fn load(&self) -> Result<BTreeSet<String>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeSet::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, rows: &BTreeSet<String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(rows).map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SkuStore for JsonFileStore {
    async fn persist_batch(&self, skus: &[Sku]) -> Result<u64, StoreError> {
        if skus.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut rows = self.load().await?;
        let inserted = skus
            .iter()
            .filter(|sku| rows.insert(sku.as_str().to_string()))
            .count();

        if inserted > 0 {
            self.save(&rows).await?;
        }

        tracing::debug!(
            path = %self.path.display(),
            batch = skus.len(),
            inserted,
            "Persisted SKU batch"
        );
        Ok(inserted as u64)
    }

    async fn delete_batch(&self, skus: &[Sku]) -> Result<u64, StoreError> {
        if skus.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut rows = self.load().await?;
        let deleted = skus.iter().filter(|sku| rows.remove(sku.as_str())).count();

        if deleted > 0 {
            self.save(&rows).await?;
        }

        tracing::debug!(
            path = %self.path.display(),
            batch = skus.len(),
            deleted,
            "Deleted SKU batch"
        );
        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skus(raw: &[&str]) -> Vec<Sku> {
        raw.iter().map(|r| Sku::parse(r).unwrap()).collect()
    }

    #[tokio::test]
    async fn persist_and_delete_round() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("records.json"));

        let data = skus(&["KASL-3423", "KASL-7777", "KASL-7777"]);
        assert_eq!(store.persist_batch(&data).await.unwrap(), 2);
        assert_eq!(store.persist_batch(&data).await.unwrap(), 0);

        assert_eq!(store.delete_batch(&data).await.unwrap(), 2);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");

        let first = JsonFileStore::new(&path);
        first.persist_batch(&skus(&["ABCD-0001"])).await.unwrap();

        let second = JsonFileStore::new(&path);
        let inserted = second
            .persist_batch(&skus(&["ABCD-0001", "ABCD-0002"]))
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let rows = second.load().await.unwrap();
        assert_eq!(
            rows.into_iter().collect::<Vec<_>>(),
            vec!["ABCD-0001".to_string(), "ABCD-0002".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_batches_do_not_create_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("records.json"));

        assert_eq!(store.persist_batch(&[]).await.unwrap(), 0);
        assert_eq!(store.delete_batch(&[]).await.unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.persist_batch(&skus(&["ABCD-0001"])).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
