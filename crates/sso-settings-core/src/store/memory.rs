// # Memory Settings Store
//
// In-memory implementation of SettingsStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for deployments where every provider runs on
// its fallback defaults after a restart.
//
// ## Crash Behavior
//
// - All persisted overrides are lost on restart/crash
// - Every provider resolves to its defaults (`origin = derived`) until
//   it is configured again

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::SettingsRecord;
use crate::store::stamp;
use crate::traits::SettingsStore;

/// In-memory settings store
///
/// Records are keyed by provider in a HashMap protected by a RwLock.
///
/// # Example
///
/// ```rust,no_run
/// use sso_settings_core::store::MemorySettingsStore;
/// use sso_settings_core::traits::SettingsStore;
/// use sso_settings_core::{FieldMap, SettingsRecord};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySettingsStore::new();
///
///     let mut record = SettingsRecord::new("github", FieldMap::new());
///     store.upsert(&mut record).await?;
///     assert!(record.is_persisted());
///
///     let stored = store.get("github").await?;
///     assert_eq!(stored.id, record.id);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<HashMap<String, SettingsRecord>>>,
}

impl MemorySettingsStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, provider: &str) -> Result<SettingsRecord, Error> {
        let guard = self.inner.read().await;
        guard
            .get(provider)
            .cloned()
            .ok_or_else(|| Error::not_found(provider))
    }

    async fn list(&self) -> Result<Vec<SettingsRecord>, Error> {
        let guard = self.inner.read().await;
        let mut records: Vec<SettingsRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.provider.cmp(&b.provider));
        Ok(records)
    }

    async fn upsert(&self, record: &mut SettingsRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let existing = guard.get(&record.provider).cloned();
        stamp(record, existing.as_ref());
        guard.insert(record.provider.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, provider: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .remove(provider)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldMap;
    use serde_json::json;

    fn record(provider: &str) -> SettingsRecord {
        let mut fields = FieldMap::new();
        fields.insert("enabled".into(), json!(true));
        SettingsRecord::new(provider, fields)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemorySettingsStore::new();
        assert!(store.is_empty().await);

        let mut github = record("github");
        store.upsert(&mut github).await.unwrap();

        assert!(github.is_persisted());
        assert!(github.created_at.is_some());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("github").await.unwrap(), github);

        store.delete("github").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_misses_are_not_found() {
        let store = MemorySettingsStore::new();

        assert!(store.get("okta").await.unwrap_err().is_not_found());
        assert!(store.delete("okta").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_keeps_id_and_created_at() {
        let store = MemorySettingsStore::new();

        let mut first = record("github");
        store.upsert(&mut first).await.unwrap();

        let mut second = record("github");
        store.upsert(&mut second).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_list_sorted_by_provider() {
        let store = MemorySettingsStore::new();
        store.upsert(&mut record("okta")).await.unwrap();
        store.upsert(&mut record("azuread")).await.unwrap();

        let providers: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.provider)
            .collect();
        assert_eq!(providers, vec!["azuread", "okta"]);
    }
}
