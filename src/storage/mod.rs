//! Key-value storage backends.
//!
//! [`InMemoryKvStore`] for tests and ephemeral sessions, [`FileKvStore`]
//! for on-device persistence across restarts.

mod file;
mod in_memory;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::traits::kv::KeyValueStore;

pub use file::FileKvStore;
pub use in_memory::InMemoryKvStore;

/// Store selected by configuration: a [`FileKvStore`] under `dir` when set,
/// otherwise an [`InMemoryKvStore`].
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match &config.dir {
        Some(dir) => Ok(Arc::new(FileKvStore::open(dir).await?)),
        None => {
            tracing::info!(target: "payflow::storage", "No storage directory, state kept in memory");
            Ok(Arc::new(InMemoryKvStore::new()))
        }
    }
}
