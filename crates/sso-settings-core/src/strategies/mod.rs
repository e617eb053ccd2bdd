// # Fallback Strategy Implementations
//
// This module provides the built-in fallback strategies. Each produces
// compiled-in defaults for the providers it owns, overlaid with the
// operator's system defaults from configuration.

pub mod oauth;
pub mod saml;

pub use oauth::OAuthStrategy;
pub use saml::SamlStrategy;
