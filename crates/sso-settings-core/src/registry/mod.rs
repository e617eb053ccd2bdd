//! Injected registries
//!
//! The service looks up two kinds of collaborators by provider name:
//! fallback strategies (who knows this provider's defaults?) and reload
//! targets (who depends on this provider's settings?). Both are built at
//! startup and passed to the service constructor.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sso_settings_core::registry::{FallbackRegistry, ReloadRegistry};
//!
//! let fallbacks = FallbackRegistry::new(vec![Arc::new(oauth_strategy)]);
//!
//! let reloadables = ReloadRegistry::new();
//! reloadables.register("github", Arc::new(github_connector));
//! ```

pub mod catalog;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::model::FieldMap;
use crate::strategies::{OAuthStrategy, SamlStrategy};
use crate::traits::{FallbackStrategy, ReloadTarget};

pub use catalog::ProviderCatalog;

/// Ordered set of fallback strategies
///
/// Every provider must be claimed by exactly one strategy. A second claimant
/// is treated as a configuration error rather than resolved by order.
#[derive(Default, Clone)]
pub struct FallbackRegistry {
    strategies: Vec<Arc<dyn FallbackStrategy>>,
}

impl FallbackRegistry {
    /// Create a registry from strategies
    pub fn new(strategies: Vec<Arc<dyn FallbackStrategy>>) -> Self {
        Self { strategies }
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategy is registered
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Names of registered strategies, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Find the single strategy that owns a provider
    ///
    /// # Errors
    ///
    /// `NoMatchingFallback` when zero or several strategies claim it.
    pub fn strategy_for(&self, provider: &str) -> Result<&Arc<dyn FallbackStrategy>> {
        let mut claims = self.strategies.iter().filter(|s| s.is_match(provider));

        match (claims.next(), claims.next()) {
            (Some(strategy), None) => Ok(strategy),
            (None, _) => Err(Error::no_matching_fallback(provider, 0)),
            (Some(_), Some(_)) => Err(Error::no_matching_fallback(provider, 2 + claims.count())),
        }
    }

    /// Load a provider's defaults from its owning strategy
    pub async fn defaults_for(&self, provider: &str) -> Result<FieldMap> {
        let strategy = self.strategy_for(provider)?;
        debug!(provider, strategy = strategy.name(), "Loading fallback defaults");
        strategy.provider_config(provider).await
    }
}

/// Build the fallback strategies the configuration calls for
///
/// OAuth is always present; SAML only when its licensed feature is active.
pub fn build_fallback_registry(config: &ServiceConfig) -> FallbackRegistry {
    let mut strategies: Vec<Arc<dyn FallbackStrategy>> =
        vec![Arc::new(OAuthStrategy::new(config.system_defaults.clone()))];

    if config.feature_enabled(catalog::SAML_FEATURE) {
        strategies.push(Arc::new(SamlStrategy::new(
            config.system_defaults.get(catalog::SAML).cloned().unwrap_or_default(),
        )));
    }

    FallbackRegistry::new(strategies)
}

/// Reload targets keyed by provider
///
/// Populated at startup; registration stays safe afterwards through an
/// internal `RwLock`.
#[derive(Default)]
pub struct ReloadRegistry {
    targets: RwLock<HashMap<String, Arc<dyn ReloadTarget>>>,
}

impl ReloadRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reload target for a provider, replacing any previous one
    pub fn register(&self, provider: impl Into<String>, target: Arc<dyn ReloadTarget>) {
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        targets.insert(provider.into(), target);
    }

    /// Look up the reload target for a provider
    pub fn get(&self, provider: &str) -> Option<Arc<dyn ReloadTarget>> {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        targets.get(provider).cloned()
    }

    /// List providers with a registered reload target, sorted
    pub fn providers(&self) -> Vec<String> {
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        let mut providers: Vec<String> = targets.keys().cloned().collect();
        providers.sort();
        providers
    }
}
