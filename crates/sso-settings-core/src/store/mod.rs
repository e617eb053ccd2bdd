// # Settings Store Implementations
//
// This module provides implementations of the SettingsStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileSettingsStore;
pub use memory::MemorySettingsStore;

use chrono::Utc;
use uuid::Uuid;

use crate::model::SettingsRecord;

/// Stamp identity and timestamps on a record being persisted
///
/// A record replacing `existing` keeps its id and creation time.
pub(crate) fn stamp(record: &mut SettingsRecord, existing: Option<&SettingsRecord>) {
    let now = Utc::now();

    match existing {
        Some(prev) => {
            record.id = prev.id.clone();
            record.created_at = prev.created_at.or(Some(now));
        }
        None => {
            if record.id.is_empty() {
                record.id = Uuid::new_v4().to_string();
            }
            record.created_at = Some(now);
        }
    }

    record.updated_at = Some(now);
}
