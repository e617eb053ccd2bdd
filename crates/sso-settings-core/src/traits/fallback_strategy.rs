// # Fallback Strategy Trait
//
// A fallback strategy owns a set of provider names and knows their system
// defaults. The service asks every registered strategy whether it owns a
// provider; exactly one must answer yes.
//
// ## Implementations
//
// - `OAuthStrategy`: the built-in OAuth providers
// - `SamlStrategy`: SAML, registered only when licensed

use async_trait::async_trait;

use crate::model::FieldMap;

/// Trait for fallback strategy implementations
#[async_trait]
pub trait FallbackStrategy: Send + Sync {
    /// Whether this strategy owns the provider
    fn is_match(&self, provider: &str) -> bool;

    /// Produce the provider's default fields
    ///
    /// Only called for providers this strategy claimed via
    /// [`FallbackStrategy::is_match`].
    async fn provider_config(&self, provider: &str) -> Result<FieldMap, crate::Error>;

    /// Strategy name (for logging/debugging)
    fn name(&self) -> &'static str;
}
