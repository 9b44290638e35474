//! In-memory key-value store

use crate::error::Result;
use crate::traits::kv::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory key-value store
///
/// Nothing is evicted and nothing survives the process. Clones share the
/// same underlying map, so a test can hand one clone to a ledger and
/// inspect the other.
///
/// # Example
///
/// ```rust,ignore
/// use payflow::storage::InMemoryKvStore;
/// use payflow::traits::KeyValueStoreExt;
///
/// let store = InMemoryKvStore::new();
/// store.set("greeting", &"bonjour").await?;
/// let value: Option<String> = store.get("greeting").await?;
/// ```
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryKvStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }
}

fn poisoned() -> crate::error::PayflowError {
    crate::error::PayflowError::internal("In-memory store lock poisoned")
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::kv::KeyValueStoreExt;

    #[tokio::test]
    async fn test_get_set() {
        let store = InMemoryKvStore::new();
        store.set("key1", &"value1").await.unwrap();

        let value: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(value, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = InMemoryKvStore::new();
        let value: Option<String> = store.get("nope").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryKvStore::new();
        store.set("key1", &"value1").await.unwrap();
        store.remove("key1").await.unwrap();

        assert!(!store.contains_key("key1"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryKvStore::new();
        let other = store.clone();
        store.set("shared", &42u32).await.unwrap();

        assert_eq!(other.get::<u32>("shared").await.unwrap(), Some(42));
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_storage_error() {
        let store = InMemoryKvStore::new();
        store.set("key", &"not a number").await.unwrap();

        let err = store.get::<u32>("key").await.unwrap_err();
        assert!(matches!(err, crate::error::PayflowError::Storage(_)));
    }
}
