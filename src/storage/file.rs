//! File-backed key-value store
//!
//! Each key is written to its own JSON file under a root directory. Writes
//! go to a temporary file first and are renamed into place, so a crash
//! mid-write leaves the previous document intact.

use crate::error::{PayflowError, Result};
use crate::traits::kv::KeyValueStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Key-value store persisting one file per key
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(target: "payflow::storage", root = %root.display(), "Opened file store");
        Ok(Self { root })
    }

    /// Directory holding the documents
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(PayflowError::bad_request("Storage key cannot be empty"));
    }
    let valid = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid || key.starts_with('.') {
        return Err(PayflowError::bad_request(format!(
            "Invalid storage key '{}': use letters, digits, '.', '_' or '-'",
            key
        )));
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.root.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::kv::KeyValueStoreExt;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("payflow-kv-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_roundtrip_survives_reopen() {
        let dir = scratch_dir();
        {
            let store = FileKvStore::open(&dir).await.unwrap();
            store.set("payflow.test", &vec![1u32, 2, 3]).await.unwrap();
        }

        let reopened = FileKvStore::open(&dir).await.unwrap();
        let value: Option<Vec<u32>> = reopened.get("payflow.test").await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        assert!(reopened.is_healthy());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_and_remove() {
        let dir = scratch_dir();
        let store = FileKvStore::open(&dir).await.unwrap();

        assert_eq!(store.get_bytes("absent").await.unwrap(), None);
        store.remove("absent").await.unwrap();

        store.set("present", &"x").await.unwrap();
        store.remove("present").await.unwrap();
        assert_eq!(store.get_bytes("present").await.unwrap(), None);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_key_validation() {
        assert!(validate_key("payflow.subscriptions").is_ok());
        assert!(validate_key("payflow.invoice_sequence.2025").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }
}
