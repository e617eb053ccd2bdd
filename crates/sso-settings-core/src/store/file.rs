// # File Settings Store
//
// File-based implementation of SettingsStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good file
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "github": {
//       "id": "4f0c...",
//       "provider": "github",
//       "fields": { "enabled": true, "client_secret": "ZW5j..." },
//       "origin": "persisted",
//       "created_at": "2025-01-09T12:00:00Z",
//       "updated_at": "2025-01-09T12:00:00Z",
//       "deleted": false
//     }
//   }
// }
// ```
//
// Secret fields are written as they arrive: base64 ciphertext.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::SettingsRecord;
use crate::store::stamp;
use crate::traits::SettingsStore;

/// Settings file format version
const SETTINGS_FILE_VERSION: &str = "1.0";

type Records = BTreeMap<String, SettingsRecord>;

/// File-based settings store with crash recovery
///
/// Every mutation rewrites the whole file before returning, so a successful
/// `upsert` or `delete` is durable.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    records: RwLock<Records>,
}

/// Serializable settings file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SettingsFileFormat {
    version: String,
    records: Records,
}

impl FileSettingsStore {
    /// Create or load a file settings store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing settings file
    /// 3. If it is corrupted, try to load from backup
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create settings directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_with_recovery(path: &Path) -> Result<Records, Error> {
        let err = match Self::load(path).await {
            Ok(records) => {
                tracing::debug!("Loaded settings file: {} records", records.len());
                return Ok(records);
            }
            Err(e @ Error::Json(_)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "Settings file {} appears corrupted: {}. Attempting recovery from backup.",
            path.display(),
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty settings.");
            return Ok(Records::new());
        }

        match Self::load(&backup_path).await {
            Ok(records) => {
                tracing::info!("Recovered settings from backup: {} records", records.len());

                if let Err(restore_err) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore settings file from backup: {}", restore_err);
                }

                Ok(records)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also corrupted: {}. Starting with empty settings.",
                    backup_err
                );
                Ok(Records::new())
            }
        }
    }

    /// Load records from a file; a missing file is empty
    async fn load(path: &Path) -> Result<Records, Error> {
        if !path.exists() {
            tracing::debug!("Settings file does not exist: {}", path.display());
            return Ok(Records::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read settings file {}: {}", path.display(), e))
        })?;

        let file: SettingsFileFormat = serde_json::from_str(&content)?;

        if file.version != SETTINGS_FILE_VERSION {
            tracing::warn!(
                "Settings file version mismatch: expected {}, got {}. Attempting to load anyway.",
                SETTINGS_FILE_VERSION,
                file.version
            );
        }

        Ok(file.records)
    }

    /// Write records atomically: temp file, backup, rename
    async fn write(&self, records: &Records) -> Result<(), Error> {
        let file = SettingsFileFormat {
            version: SETTINGS_FILE_VERSION.to_string(),
            records: records.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize settings: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!("Failed to create temp file {}: {}", temp_path.display(), e))
            })?;

            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write temp file {}: {}", temp_path.display(), e))
            })?;

            out.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush temp file {}: {}", temp_path.display(), e))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Settings written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, provider: &str) -> Result<SettingsRecord, Error> {
        let guard = self.records.read().await;
        guard
            .get(provider)
            .cloned()
            .ok_or_else(|| Error::not_found(provider))
    }

    async fn list(&self) -> Result<Vec<SettingsRecord>, Error> {
        let guard = self.records.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn upsert(&self, record: &mut SettingsRecord) -> Result<(), Error> {
        // Held across the write so file order matches mutation order
        let mut guard = self.records.write().await;

        let mut candidate = record.clone();
        let existing = guard.get(&candidate.provider).cloned();
        stamp(&mut candidate, existing.as_ref());

        let previous = guard.insert(candidate.provider.clone(), candidate.clone());
        if let Err(e) = self.write(&guard).await {
            match previous {
                Some(prev) => guard.insert(prev.provider.clone(), prev),
                None => guard.remove(&candidate.provider),
            };
            return Err(e);
        }

        *record = candidate;
        Ok(())
    }

    async fn delete(&self, provider: &str) -> Result<(), Error> {
        let mut guard = self.records.write().await;

        let removed = guard.remove(provider).ok_or_else(|| Error::not_found(provider))?;
        if let Err(e) = self.write(&guard).await {
            guard.insert(removed.provider.clone(), removed);
            return Err(e);
        }

        Ok(())
    }
}
