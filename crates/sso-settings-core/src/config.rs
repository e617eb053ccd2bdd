//! Configuration types for the SSO settings service
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::model::FieldMap;
use crate::registry::catalog::{GRAFANA_COM, OAUTH_PROVIDERS, SAML};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Providers whose settings may be mutated at runtime
    #[serde(default = "default_configurable_providers")]
    pub configurable_providers: BTreeSet<String>,

    /// Licensed features that are active (e.g. "saml")
    #[serde(default)]
    pub licensed_features: BTreeSet<String>,

    /// Operator-supplied system defaults, keyed by provider
    ///
    /// Overlaid on the built-in defaults of each fallback strategy.
    #[serde(default)]
    pub system_defaults: HashMap<String, FieldMap>,

    /// Settings store selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Reload worker settings
    #[serde(default)]
    pub reload: ReloadConfig,
}

impl ServiceConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            configurable_providers: default_configurable_providers(),
            licensed_features: BTreeSet::new(),
            system_defaults: HashMap::new(),
            store: StoreConfig::default(),
            reload: ReloadConfig::default(),
        }
    }

    /// Replace the configurable-provider allow-list
    pub fn with_configurable_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configurable_providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable a licensed feature
    pub fn with_licensed_feature(mut self, feature: impl Into<String>) -> Self {
        self.licensed_features.insert(feature.into());
        self
    }

    /// Set the system defaults for one provider
    pub fn with_system_defaults(mut self, provider: impl Into<String>, fields: FieldMap) -> Self {
        self.system_defaults.insert(provider.into(), fields);
        self
    }

    /// Whether a licensed feature is active
    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.licensed_features.contains(feature)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for provider in &self.configurable_providers {
            if provider != SAML && !OAUTH_PROVIDERS.contains(&provider.as_str()) {
                return Err(crate::Error::config(format!(
                    "Unknown configurable provider: {}",
                    provider
                )));
            }
        }

        self.store.validate()?;
        self.reload.validate()?;

        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based settings store
    File {
        /// Path to the settings file
        path: String,
    },

    /// In-memory settings store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("Settings store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Reload worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Capacity of the reload job queue
    ///
    /// When full, new jobs are dropped with a warning log.
    #[serde(default = "default_reload_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of the reload event channel
    ///
    /// When full, new events are dropped with a warning log.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReloadConfig {
    /// Validate the reload configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.queue_capacity == 0 {
            return Err(crate::Error::config("Reload queue capacity must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Reload event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_reload_queue_capacity(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_configurable_providers() -> BTreeSet<String> {
    OAUTH_PROVIDERS
        .iter()
        .filter(|provider| **provider != GRAFANA_COM)
        .map(|provider| provider.to_string())
        .collect()
}

fn default_reload_queue_capacity() -> usize {
    256
}

fn default_event_channel_capacity() -> usize {
    1000
}
