//! Key-value store trait for persisted ledger state
//!
//! Ledgers hydrate from and persist to a key-value store: one serialized
//! document per key, replaced wholesale on every write.

use crate::error::Result;
use async_trait::async_trait;

/// Persistent key-value storage
///
/// Note: This trait uses type-erased serialization to be object-safe.
/// Use the helper methods `get` and `set` from [`KeyValueStoreExt`] which
/// handle serialization internally.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the raw bytes stored under `key`
    ///
    /// Returns `Ok(None)` if the key has never been written or was removed.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value stored under `key`
    ///
    /// Stores must hand back exactly these bytes from `get_bytes`.
    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove the value stored under `key` (no-op if absent)
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if the storage backend is usable
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Helper trait for type-safe store operations
///
/// Values are stored as JSON. There is no schema migration: a document
/// that no longer deserializes surfaces as a storage error.
#[allow(async_fn_in_trait)]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Read and deserialize the value stored under `key`
    async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.get_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store `value` under `key`
    async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: serde::Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set_bytes(key, bytes).await
    }
}

// Blanket implementation - all KeyValueStore implementations get the helpers for free
impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get_bytes(key).await
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).set_bytes(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}
