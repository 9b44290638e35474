//! Deletion history with restore.
//!
//! Soft-deleting a company or employee records a full snapshot here.
//! Restoring pops the record and hands the snapshot back; putting the
//! entity back into the backend is the caller's job (see
//! [`PayrollService::restore`](crate::service::PayrollService::restore)).
//!
//! ```rust,ignore
//! use payflow::deletion::{DeletedEntityType, DeletionLedger};
//!
//! let ledger = DeletionLedger::new(store);
//! let record = ledger
//!     .record_deletion(DeletedEntityType::Employee, serde_json::to_value(&employee)?, None)
//!     .await?;
//!
//! if let Some(restored) = ledger.restore_item(&record.id).await? {
//!     let employee: Employee = serde_json::from_value(restored.data)?;
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::traits::kv::{KeyValueStore, KeyValueStoreExt};

/// Storage key of the persisted deletion history.
pub const DELETIONS_KEY: &str = "payflow.deletions";

/// Reasons longer than this are truncated.
const MAX_REASON_LENGTH: usize = 1000;

/// Kind of entity a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedEntityType {
    Company,
    Employee,
}

impl DeletedEntityType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Employee => "employee",
        }
    }
}

impl std::fmt::Display for DeletedEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One soft-deleted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: DeletedEntityType,
    pub deleted_at: DateTime<Utc>,
    pub reason: Option<String>,
    /// Full snapshot of the entity at deletion time.
    pub data: serde_json::Value,
}

/// Counts per entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionStats {
    pub total: usize,
    pub companies: usize,
    pub employees: usize,
}

/// Append-only history of deletions, newest first.
pub struct DeletionLedger<S, C = SystemClock> {
    store: S,
    clock: C,
    records: RwLock<Vec<DeletionRecord>>,
}

impl<S: KeyValueStore> DeletionLedger<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<S: KeyValueStore, C: Clock> DeletionLedger<S, C> {
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> DeletionLedger<S, C2> {
        DeletionLedger {
            store: self.store,
            clock,
            records: self.records,
        }
    }

    /// Replace in-memory history with what is persisted.
    pub async fn hydrate(&self) -> Result<usize> {
        let loaded: Vec<DeletionRecord> = self.store.get(DELETIONS_KEY).await?.unwrap_or_default();
        let count = loaded.len();
        *self.records.write().await = loaded;
        tracing::debug!(target: "payflow::deletion", records = count, "Deletion history hydrated");
        Ok(count)
    }

    /// Prepend a record for a freshly deleted entity.
    pub async fn record_deletion(
        &self,
        entity_type: DeletedEntityType,
        data: serde_json::Value,
        reason: Option<String>,
    ) -> Result<DeletionRecord> {
        let record = DeletionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            entity_type,
            deleted_at: self.clock.now(),
            reason: reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .map(|r| r.chars().take(MAX_REASON_LENGTH).collect()),
            data,
        };

        let mut records = self.records.write().await;
        records.insert(0, record.clone());
        if let Err(err) = self.store.set(DELETIONS_KEY, &*records).await {
            records.remove(0);
            return Err(err);
        }

        tracing::info!(
            target: "payflow::deletion",
            deletion_id = %record.id,
            entity_type = %entity_type,
            "Deletion recorded"
        );
        Ok(record)
    }

    /// Remove a record and return it. Unknown ids return `None`.
    pub async fn restore_item(&self, id: &str) -> Result<Option<DeletionRecord>> {
        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            tracing::debug!(target: "payflow::deletion", deletion_id = %id, "No deletion record to restore");
            return Ok(None);
        };

        let record = records.remove(index);
        if let Err(err) = self.store.set(DELETIONS_KEY, &*records).await {
            records.insert(index, record);
            return Err(err);
        }

        tracing::info!(
            target: "payflow::deletion",
            deletion_id = %id,
            entity_type = %record.entity_type,
            "Deletion record restored"
        );
        Ok(Some(record))
    }

    /// All records, newest first.
    pub async fn list(&self) -> Vec<DeletionRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<DeletionRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Records of one entity type, newest first.
    pub async fn by_type(&self, entity_type: DeletedEntityType) -> Vec<DeletionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.entity_type == entity_type)
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> DeletionStats {
        let records = self.records.read().await;
        let companies = records
            .iter()
            .filter(|r| r.entity_type == DeletedEntityType::Company)
            .count();
        DeletionStats {
            total: records.len(),
            companies,
            employees: records.len() - companies,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Drop the whole history and persist the empty list.
    pub async fn clear(&self) -> Result<()> {
        let mut records = self.records.write().await;
        self.store.remove(DELETIONS_KEY).await?;
        records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test::ManualClock;
    use crate::storage::InMemoryKvStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn ledger() -> (DeletionLedger<InMemoryKvStore, ManualClock>, InMemoryKvStore, ManualClock) {
        let store = InMemoryKvStore::new();
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let ledger = DeletionLedger::new(store.clone()).with_clock(clock.clone());
        (ledger, store, clock)
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let (ledger, _, _) = ledger();
        let snapshot = json!({
            "id": "emp_1",
            "first_name": "Jeanne",
            "hourly_rate": "45.00",
            "client_company_id": "client_b"
        });

        let record = ledger
            .record_deletion(DeletedEntityType::Employee, snapshot.clone(), Some("Left".to_string()))
            .await
            .unwrap();
        assert_eq!(ledger.len().await, 1);

        let restored = ledger.restore_item(&record.id).await.unwrap().unwrap();
        assert_eq!(restored.data, snapshot);
        assert_eq!(restored.reason.as_deref(), Some("Left"));
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn test_restore_unknown_is_noop() {
        let (ledger, _, _) = ledger();
        ledger
            .record_deletion(DeletedEntityType::Company, json!({"id": "c1"}), None)
            .await
            .unwrap();

        assert!(ledger.restore_item("missing").await.unwrap().is_none());
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_newest_first_and_filters() {
        let (ledger, _, clock) = ledger();
        ledger
            .record_deletion(DeletedEntityType::Company, json!({"id": "c1"}), None)
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(5));
        ledger
            .record_deletion(DeletedEntityType::Employee, json!({"id": "e1"}), None)
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(5));
        ledger
            .record_deletion(DeletedEntityType::Employee, json!({"id": "e2"}), None)
            .await
            .unwrap();

        let all = ledger.list().await;
        assert_eq!(all[0].data["id"], "e2");
        assert_eq!(all[2].data["id"], "c1");
        assert!(all[0].deleted_at > all[1].deleted_at);

        let employees = ledger.by_type(DeletedEntityType::Employee).await;
        assert_eq!(employees.len(), 2);
        assert_eq!(
            ledger.stats().await,
            DeletionStats {
                total: 3,
                companies: 1,
                employees: 2
            }
        );
    }

    #[tokio::test]
    async fn test_reason_is_trimmed_and_capped() {
        let (ledger, _, _) = ledger();
        let blank = ledger
            .record_deletion(DeletedEntityType::Company, json!({}), Some("   ".to_string()))
            .await
            .unwrap();
        assert!(blank.reason.is_none());

        let long = ledger
            .record_deletion(DeletedEntityType::Company, json!({}), Some("x".repeat(5000)))
            .await
            .unwrap();
        assert_eq!(long.reason.unwrap().len(), MAX_REASON_LENGTH);
    }

    #[tokio::test]
    async fn test_hydrate_and_clear() {
        let (ledger, store, _) = ledger();
        let record = ledger
            .record_deletion(DeletedEntityType::Employee, json!({"id": "e1"}), None)
            .await
            .unwrap();

        let reopened = DeletionLedger::new(store.clone());
        assert_eq!(reopened.hydrate().await.unwrap(), 1);
        assert_eq!(reopened.get(&record.id).await, Some(record));

        reopened.clear().await.unwrap();
        assert!(reopened.is_empty().await);
        assert!(!store.contains_key(DELETIONS_KEY));
    }

    #[test]
    fn test_record_serde_uses_type_field() {
        let record = DeletionRecord {
            id: "d1".to_string(),
            entity_type: DeletedEntityType::Company,
            deleted_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            reason: None,
            data: json!({"id": "c1"}),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "company");
    }
}
