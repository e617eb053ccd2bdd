//! SSO settings service
//!
//! The [`SsoSettingsService`] is responsible for:
//! - Resolving each provider's settings from the store and its fallback defaults
//! - Decrypting or redacting secret fields on read paths
//! - Validating, encrypting and persisting mutations
//! - Handing committed mutations to the reload worker
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────────────┐
//!   get / list ─────▶│  SsoSettingsService│◀───── upsert / delete
//!                    └────────────────────┘
//!                              │
//!         ┌────────────────────┼─────────────────────┬──────────────────┐
//!         ▼                    ▼                     ▼                  ▼
//! ┌───────────────┐   ┌─────────────────┐   ┌─────────────────┐  ┌──────────────┐
//! │ SettingsStore │   │ FallbackRegistry│   │ SecretTransform │  │ReloadWorker  │
//! │ (persisted)   │   │ (defaults)      │   │ (codec)         │  │ (async)      │
//! └───────────────┘   └─────────────────┘   └─────────────────┘  └──────────────┘
//! ```
//!
//! ## Upsert Flow
//!
//! 1. Provider must be configurable and have a reload target
//! 2. Reload target validates the candidate
//! 3. Load defaults and the prior record
//! 4. Resolve secret deltas, persist ciphertext
//! 5. Enqueue the plaintext record for reload, without waiting
//!
//! ## Concurrency
//!
//! Concurrent upserts for the same provider are not serialized here. The
//! store's own atomicity decides which one wins.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::model::{Actor, Origin, SettingsRecord};
use crate::reconciler::{Reconciler, SecretView, merge_fields};
use crate::registry::{FallbackRegistry, ProviderCatalog, ReloadRegistry};
use crate::reload::{ReloadDispatcher, ReloadEvent, ReloadJob, ReloadWorker};
use crate::secrets::SecretTransform;
use crate::traits::{SecretCodec, SettingsStore};

/// Reconciles, protects and mutates per-provider SSO settings
///
/// ## Lifecycle
///
/// 1. Create with [`SsoSettingsService::new()`], which spawns the reload worker
/// 2. Serve reads and mutations; call [`SsoSettingsService::reload_all()`]
///    from whatever schedules periodic reconciliation
/// 3. Drop the service, then call [`ReloadWorker::shutdown()`]
#[derive(Clone)]
pub struct SsoSettingsService {
    store: Arc<dyn SettingsStore>,
    reconciler: Reconciler,
    catalog: ProviderCatalog,
    targets: Arc<ReloadRegistry>,
    dispatcher: ReloadDispatcher,
}

impl SsoSettingsService {
    /// Create the service and spawn its reload worker
    ///
    /// # Parameters
    ///
    /// - `config`: service configuration, validated here
    /// - `store`: settings store implementation
    /// - `codec`: secret codec implementation
    /// - `fallbacks`: fallback strategies (see [`crate::registry::build_fallback_registry`])
    /// - `targets`: reload targets keyed by provider
    ///
    /// # Returns
    ///
    /// A tuple of (service, worker, event_receiver) where event_receiver
    /// yields reload events. Dropping the worker handle leaves the worker
    /// running for as long as the service lives.
    #[must_use = "keep the worker handle to shut reloads down cleanly"]
    pub fn new(
        config: &ServiceConfig,
        store: Arc<dyn SettingsStore>,
        codec: Arc<dyn SecretCodec>,
        fallbacks: FallbackRegistry,
        targets: Arc<ReloadRegistry>,
    ) -> Result<(Self, ReloadWorker, mpsc::Receiver<ReloadEvent>)> {
        config.validate()?;

        let (worker, dispatcher, events) =
            ReloadWorker::spawn(&config.reload, fallbacks.clone(), targets.clone());

        let service = Self {
            store,
            reconciler: Reconciler::new(fallbacks, SecretTransform::new(codec)),
            catalog: ProviderCatalog::from_config(config),
            targets,
            dispatcher,
        };

        info!(
            providers = service.catalog.providers().len(),
            strategies = service.reconciler.fallbacks().len(),
            "SSO settings service ready"
        );

        Ok((service, worker, events))
    }

    /// Ordered list of known providers
    pub fn providers(&self) -> &[String] {
        self.catalog.providers()
    }

    /// Whether runtime mutation of the provider is permitted
    pub fn is_configurable(&self, provider: &str) -> bool {
        self.catalog.is_configurable(provider)
    }

    /// Resolved settings for one provider, secrets in plaintext
    ///
    /// Only persisted secrets go through the codec; defaults are used as is.
    pub async fn get(&self, provider: &str) -> Result<SettingsRecord> {
        let persisted = self.load_persisted(provider).await?;
        self.reconciler
            .resolve_one(provider, persisted, SecretView::Plaintext)
            .await
    }

    /// Resolved settings for one provider, secrets redacted
    pub async fn get_redacted(&self, provider: &str) -> Result<SettingsRecord> {
        let persisted = self.load_persisted(provider).await?;
        self.reconciler
            .resolve_one(provider, persisted, SecretView::Redacted)
            .await
    }

    /// Resolved settings for every known provider, secrets in plaintext
    ///
    /// Fails as a whole if any provider cannot be resolved.
    pub async fn list(&self) -> Result<Vec<SettingsRecord>> {
        let persisted = self.store.list().await?;
        self.reconciler
            .resolve_all(persisted, self.catalog.providers(), SecretView::Plaintext)
            .await
    }

    /// Resolved settings for every configurable provider, secrets redacted
    ///
    /// Fails as a whole if any provider cannot be resolved.
    pub async fn list_redacted(&self) -> Result<Vec<SettingsRecord>> {
        let providers: Vec<String> = self
            .catalog
            .providers()
            .iter()
            .filter(|p| self.catalog.is_configurable(p))
            .cloned()
            .collect();

        let persisted = self.store.list().await?;
        self.reconciler
            .resolve_all(persisted, &providers, SecretView::Redacted)
            .await
    }

    /// Validate, encrypt and persist a provider's settings
    ///
    /// Secret fields set to [`crate::secrets::UNCHANGED_MARKER`] keep their
    /// current ciphertext. On success `record` holds what was stored:
    /// assigned id, timestamps and ciphertext secrets. The reload target is
    /// notified afterwards on the worker; its outcome does not affect the
    /// result.
    ///
    /// # Errors
    ///
    /// - `NotConfigurable`: provider not in the allow-list
    /// - `ProviderNotConfigurable`: no reload target registered
    /// - the reload target's validation error, verbatim
    /// - `NoMatchingFallback`, secret encoding/codec errors, store errors
    pub async fn upsert(&self, record: &mut SettingsRecord, actor: &Actor) -> Result<()> {
        let provider = record.provider.clone();

        if !self.catalog.is_configurable(&provider) {
            return Err(Error::NotConfigurable(provider));
        }

        let target = self
            .targets
            .get(&provider)
            .ok_or_else(|| Error::ProviderNotConfigurable(provider.clone()))?;

        target.validate(record, actor).await?;

        let defaults = self.reconciler.fallbacks().defaults_for(&provider).await?;
        let prior = self.load_persisted(&provider).await?;

        let delta = self
            .reconciler
            .secrets()
            .resolve_secret_delta(&provider, &record.fields, prior.as_ref().map(|r| &r.fields))
            .await?;

        record.fields = delta.persisted;
        record.origin = Origin::Persisted;
        record.deleted = false;

        self.store.upsert(record).await?;
        info!(provider = %provider, actor = %actor.login, "SSO settings updated");

        let resolved = SettingsRecord {
            fields: merge_fields(&defaults, &delta.plaintext),
            ..record.clone()
        };
        self.dispatcher.enqueue(ReloadJob::Apply { record: resolved });

        Ok(())
    }

    /// Remove a provider's persisted settings, reverting it to defaults
    ///
    /// # Errors
    ///
    /// - `NotConfigurable`: provider not in the allow-list; the store is not touched
    /// - `NotFound`: nothing was persisted for the provider
    /// - other store errors
    pub async fn delete(&self, provider: &str) -> Result<()> {
        if !self.catalog.is_configurable(provider) {
            return Err(Error::NotConfigurable(provider.to_string()));
        }

        self.store.delete(provider).await?;
        info!(provider, "SSO settings deleted");

        self.dispatcher.enqueue(ReloadJob::Revert {
            provider: provider.to_string(),
        });

        Ok(())
    }

    /// Push the current resolved settings to every reload target
    ///
    /// Each provider is reloaded independently; failures are logged and the
    /// pass continues. Providers with no fields or no target are skipped.
    pub async fn reload_all(&self) {
        let resolved = match self.list().await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Failed to list SSO settings for reload: {}", e);
                return;
            }
        };

        for record in resolved {
            if record.fields.is_empty() {
                continue;
            }

            let Some(target) = self.targets.get(&record.provider) else {
                continue;
            };

            match target.reload(&record).await {
                Ok(()) => debug!(provider = %record.provider, "Reloaded SSO settings"),
                Err(e) => error!(provider = %record.provider, "Failed to reload SSO settings: {}", e),
            }
        }
    }

    /// Store lookup where a miss is `None`
    async fn load_persisted(&self, provider: &str) -> Result<Option<SettingsRecord>> {
        match self.store.get(provider).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
