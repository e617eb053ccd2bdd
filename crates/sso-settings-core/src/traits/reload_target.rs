// # Reload Target Trait
//
// A reload target is a subsystem that depends on one provider's settings,
// such as the login connector for that provider. It vets candidate settings
// before they are persisted and is told about the resolved settings after
// every committed mutation.

use async_trait::async_trait;

use crate::model::{Actor, SettingsRecord};

/// Trait for reload target implementations
///
/// # Failure Semantics
///
/// - `validate` errors abort the mutation and reach the caller verbatim
/// - `reload` errors happen after commit; they are logged and reported as
///   `ReloadEvent::Failed`, never returned to the mutating caller
#[async_trait]
pub trait ReloadTarget: Send + Sync {
    /// Check candidate settings before they are persisted
    ///
    /// `record.fields` are exactly as submitted: plaintext secrets, or the
    /// unchanged marker for secrets the caller did not touch.
    async fn validate(&self, record: &SettingsRecord, actor: &Actor) -> Result<(), crate::Error>;

    /// Apply resolved plaintext settings
    async fn reload(&self, record: &SettingsRecord) -> Result<(), crate::Error>;
}
