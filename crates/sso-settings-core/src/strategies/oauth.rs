// # OAuth Fallback Strategy
//
// Owns the built-in OAuth providers. Defaults come from two layers:
//
// 1. Compiled-in values (display name, icon, well-known endpoints, scopes)
// 2. Operator system defaults from `ServiceConfig::system_defaults`
//
// Non-empty operator values win; an empty operator value leaves the
// compiled-in one visible.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::FieldMap;
use crate::reconciler::merge_fields;
use crate::registry::catalog::{
    AZURE_AD, GENERIC_OAUTH, GITHUB, GITLAB, GOOGLE, GRAFANA_COM, OAUTH_PROVIDERS, OKTA,
};
use crate::traits::FallbackStrategy;

/// Fallback strategy for the built-in OAuth providers
#[derive(Debug, Clone, Default)]
pub struct OAuthStrategy {
    system_defaults: HashMap<String, FieldMap>,
}

impl OAuthStrategy {
    /// Create the strategy over operator system defaults
    pub fn new(system_defaults: HashMap<String, FieldMap>) -> Self {
        Self { system_defaults }
    }
}

#[async_trait]
impl FallbackStrategy for OAuthStrategy {
    fn is_match(&self, provider: &str) -> bool {
        OAUTH_PROVIDERS.contains(&provider)
    }

    async fn provider_config(&self, provider: &str) -> Result<FieldMap> {
        let builtin = builtin_defaults(provider)?;

        Ok(match self.system_defaults.get(provider) {
            Some(operator) => merge_fields(&builtin, operator),
            None => builtin,
        })
    }

    fn name(&self) -> &'static str {
        "oauth"
    }
}

/// Compiled-in defaults for one OAuth provider
fn builtin_defaults(provider: &str) -> Result<FieldMap> {
    let (name, icon, endpoints, scopes, use_pkce) = match provider {
        GITHUB => (
            "GitHub",
            "github",
            Some((
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com/user",
            )),
            "user:email,read:org",
            false,
        ),
        GITLAB => (
            "GitLab",
            "gitlab",
            Some((
                "https://gitlab.com/oauth/authorize",
                "https://gitlab.com/oauth/token",
                "https://gitlab.com/api/v4",
            )),
            "openid,email,profile",
            true,
        ),
        GOOGLE => (
            "Google",
            "google",
            Some((
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://openidconnect.googleapis.com/v1/userinfo",
            )),
            "openid,email,profile",
            true,
        ),
        GRAFANA_COM => (
            "Grafana.com",
            "grafana",
            Some((
                "https://grafana.com/oauth2/authorize",
                "https://grafana.com/api/oauth2/token",
                "https://grafana.com/api/oauth2/user",
            )),
            "user:email",
            false,
        ),
        GENERIC_OAUTH => ("OAuth", "signin", None, "user:email", false),
        AZURE_AD => ("Microsoft", "microsoft", None, "openid,email,profile", true),
        OKTA => ("Okta", "okta", None, "openid,profile,email,groups", true),
        _ => return Err(Error::no_matching_fallback(provider, 0)),
    };

    let (auth_url, token_url, api_url) = endpoints.unwrap_or(("", "", ""));

    let defaults = json!({
        "enabled": false,
        "name": name,
        "icon": icon,
        "client_id": "",
        "client_secret": "",
        "auth_url": auth_url,
        "token_url": token_url,
        "api_url": api_url,
        "scopes": scopes,
        "allow_sign_up": true,
        "auto_login": false,
        "use_pkce": use_pkce,
        "use_refresh_token": false,
        "skip_org_role_sync": false,
    });

    match defaults {
        Value::Object(fields) => Ok(fields),
        _ => Err(Error::Other("built-in defaults must be an object".to_string())),
    }
}
