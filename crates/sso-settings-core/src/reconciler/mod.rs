//! Settings reconciler
//!
//! Merges a provider's persisted record with its fallback defaults into the
//! single record handed to consumers.
//!
//! ## Merge Rule
//!
//! ```text
//! defaults   { client_id: "cid", scopes: "user:email", name: "GitHub" }
//! persisted  { enabled: true, name: "" }
//!                         │
//!                         ▼
//! resolved   { client_id: "cid", scopes: "user:email", name: "GitHub", enabled: true }
//! ```
//!
//! Every default key appears in the result. A persisted value overrides its
//! default only when it is non-empty; `""` and `null` leave the default
//! visible.
//!
//! ## Secret Views
//!
//! - [`SecretView::Plaintext`]: persisted secrets are decrypted *before* the
//!   merge, so default secrets never reach the codec
//! - [`SecretView::Redacted`]: nothing is decrypted; every non-empty secret is
//!   masked *after* the merge

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::model::{FieldMap, Origin, SettingsRecord, is_empty_value};
use crate::registry::FallbackRegistry;
use crate::secrets::{SecretTransform, redact_secrets};

/// Overlay the non-empty values of `overrides` onto `defaults`
///
/// Key order: defaults first, then keys only present in `overrides`.
pub fn merge_fields(defaults: &FieldMap, overrides: &FieldMap) -> FieldMap {
    let mut merged = defaults.clone();

    for (key, value) in overrides {
        if is_empty_value(value) {
            // Keep an empty key visible when no default covers it
            merged.entry(key.clone()).or_insert_with(|| value.clone());
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// Resolve one provider's record
///
/// With a persisted record the result keeps its id and timestamps and is
/// marked [`Origin::Persisted`]; without one it is [`Origin::Derived`].
pub fn resolve(provider: &str, persisted: Option<&SettingsRecord>, defaults: FieldMap) -> SettingsRecord {
    match persisted {
        Some(record) => SettingsRecord {
            id: record.id.clone(),
            provider: provider.to_string(),
            fields: merge_fields(&defaults, &record.fields),
            origin: Origin::Persisted,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted: false,
        },
        None => SettingsRecord::derived(provider, defaults),
    }
}

/// How secret fields appear in a resolved record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretView {
    /// Persisted secrets decrypted, for internal consumers
    Plaintext,
    /// Every non-empty secret replaced by the redaction marker
    Redacted,
}

/// Combines fallback defaults, persisted records and secret transforms
#[derive(Clone)]
pub struct Reconciler {
    fallbacks: FallbackRegistry,
    secrets: SecretTransform,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(fallbacks: FallbackRegistry, secrets: SecretTransform) -> Self {
        Self { fallbacks, secrets }
    }

    /// Fallback registry in use
    pub fn fallbacks(&self) -> &FallbackRegistry {
        &self.fallbacks
    }

    /// Secret transform engine in use
    pub fn secrets(&self) -> &SecretTransform {
        &self.secrets
    }

    /// Resolve one provider in the requested view
    ///
    /// # Errors
    ///
    /// - `NoMatchingFallback` when the provider has no single owning strategy
    /// - secret decoding errors for [`SecretView::Plaintext`]
    pub async fn resolve_one(
        &self,
        provider: &str,
        persisted: Option<SettingsRecord>,
        view: SecretView,
    ) -> Result<SettingsRecord> {
        let defaults = self.fallbacks.defaults_for(provider).await?;

        let persisted = match (persisted, view) {
            (Some(mut record), SecretView::Plaintext) => {
                record.fields = self.secrets.decrypt_secrets(provider, &record.fields).await?;
                Some(record)
            }
            (other, _) => other,
        };

        let mut resolved = resolve(provider, persisted.as_ref(), defaults);

        if view == SecretView::Redacted {
            resolved.fields = redact_secrets(&resolved.fields);
        }

        debug!(provider, origin = ?resolved.origin, "Resolved settings");
        Ok(resolved)
    }

    /// Resolve every listed provider, in `providers` order
    ///
    /// Persisted records for providers outside `providers` are ignored. The
    /// whole call fails on the first provider that cannot be resolved.
    pub async fn resolve_all(
        &self,
        all_persisted: Vec<SettingsRecord>,
        providers: &[String],
        view: SecretView,
    ) -> Result<Vec<SettingsRecord>> {
        let mut by_provider: HashMap<String, SettingsRecord> = all_persisted
            .into_iter()
            .map(|record| (record.provider.clone(), record))
            .collect();

        let mut resolved = Vec::with_capacity(providers.len());
        for provider in providers {
            let persisted = by_provider.remove(provider);
            resolved.push(self.resolve_one(provider, persisted, view).await?);
        }

        Ok(resolved)
    }
}
