// # SAML Fallback Strategy
//
// Owns the `saml` provider. Only registered when the `saml` licensed
// feature is active (see `build_fallback_registry`).

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::model::FieldMap;
use crate::reconciler::merge_fields;
use crate::registry::catalog::SAML;
use crate::traits::FallbackStrategy;

/// Fallback strategy for the SAML provider
#[derive(Debug, Clone, Default)]
pub struct SamlStrategy {
    system_defaults: FieldMap,
}

impl SamlStrategy {
    /// Create the strategy over the operator's SAML defaults
    pub fn new(system_defaults: FieldMap) -> Self {
        Self { system_defaults }
    }
}

#[async_trait]
impl FallbackStrategy for SamlStrategy {
    fn is_match(&self, provider: &str) -> bool {
        provider == SAML
    }

    async fn provider_config(&self, provider: &str) -> Result<FieldMap> {
        if provider != SAML {
            return Err(Error::no_matching_fallback(provider, 0));
        }

        let builtin = match json!({
            "enabled": false,
            "name": "SAML",
            "single_logout": false,
            "allow_sign_up": true,
            "auto_login": false,
            "allow_idp_initiated": false,
            "certificate": "",
            "private_key": "",
            "signature_algorithm": "",
            "idp_metadata_url": "",
            "assertion_attribute_name": "displayName",
            "assertion_attribute_login": "login",
            "assertion_attribute_email": "email",
            "max_issue_delay": "90s",
            "metadata_valid_duration": "48h",
        }) {
            Value::Object(fields) => fields,
            _ => return Err(Error::Other("built-in defaults must be an object".to_string())),
        };

        Ok(merge_fields(&builtin, &self.system_defaults))
    }

    fn name(&self) -> &'static str {
        "saml"
    }
}
