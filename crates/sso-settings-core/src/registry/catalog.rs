//! Provider catalog
//!
//! The ordered list of providers the service exposes: the built-in OAuth
//! providers, plus SAML when it is both licensed and configurable.

use std::collections::BTreeSet;

use crate::config::ServiceConfig;

pub const GITHUB: &str = "github";
pub const GITLAB: &str = "gitlab";
pub const GOOGLE: &str = "google";
pub const GENERIC_OAUTH: &str = "generic_oauth";
pub const GRAFANA_COM: &str = "grafana_com";
pub const AZURE_AD: &str = "azuread";
pub const OKTA: &str = "okta";
pub const SAML: &str = "saml";

/// Built-in OAuth providers, in display order
pub const OAUTH_PROVIDERS: [&str; 7] = [GITHUB, GITLAB, GOOGLE, GENERIC_OAUTH, GRAFANA_COM, AZURE_AD, OKTA];

/// Licensed feature that unlocks the SAML provider
pub const SAML_FEATURE: &str = "saml";

/// Ordered provider list plus the mutation allow-list
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: Vec<String>,
    configurable: BTreeSet<String>,
}

impl ProviderCatalog {
    /// Build the catalog from configuration
    pub fn from_config(config: &ServiceConfig) -> Self {
        let mut providers: Vec<String> = OAUTH_PROVIDERS.iter().map(|p| p.to_string()).collect();

        if config.feature_enabled(SAML_FEATURE) && config.configurable_providers.contains(SAML) {
            providers.push(SAML.to_string());
        }

        Self {
            providers,
            configurable: config.configurable_providers.clone(),
        }
    }

    /// All providers, in display order
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Whether the provider is listed
    pub fn contains(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p == provider)
    }

    /// Whether runtime mutation of the provider is permitted
    pub fn is_configurable(&self, provider: &str) -> bool {
        self.configurable.contains(provider)
    }
}
