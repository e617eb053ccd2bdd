// # Settings Store Trait
//
// Defines the interface for persisting SSO settings records.
//
// ## Purpose
//
// The store holds the operator's overrides, one record per provider. The
// service never assumes anything about the backing medium; it only relies
// on the not-found sentinel being distinct from every other failure.
//
// ## Implementations
//
// - In-memory: `MemorySettingsStore`
// - File-based: `FileSettingsStore` (JSON with backup recovery)
// - Future: SQL databases
//
// ## Usage
//
// ```rust,ignore
// use sso_settings_core::{SettingsStore, SettingsRecord};
//
// let store = /* SettingsStore implementation */;
//
// match store.get("github").await {
//     Ok(record) => println!("{} fields", record.fields.len()),
//     Err(e) if e.is_not_found() => println!("no overrides"),
//     Err(e) => return Err(e),
// }
// ```

use async_trait::async_trait;

use crate::model::SettingsRecord;

/// Trait for settings store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Atomicity
///
/// The service does not serialize concurrent upserts for the same provider.
/// Whatever atomicity the store gives a single `upsert` (transaction,
/// compare-and-swap, write lock) is the only protection against lost updates.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get the persisted record for a provider
    ///
    /// # Returns
    ///
    /// - `Ok(SettingsRecord)`: The persisted record
    /// - `Err(Error::NotFound)`: No record for this provider
    /// - `Err(Error)`: Storage error
    async fn get(&self, provider: &str) -> Result<SettingsRecord, crate::Error>;

    /// List every persisted record
    async fn list(&self) -> Result<Vec<SettingsRecord>, crate::Error>;

    /// Create or replace the record for `record.provider`
    ///
    /// Assigns `id` on first persist and sets `created_at` / `updated_at`
    /// on the passed record.
    async fn upsert(&self, record: &mut SettingsRecord) -> Result<(), crate::Error>;

    /// Delete the record for a provider
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted
    /// - `Err(Error::NotFound)`: Nothing was stored for this provider
    /// - `Err(Error)`: Storage error
    async fn delete(&self, provider: &str) -> Result<(), crate::Error>;
}
