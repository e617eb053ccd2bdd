//! Error types for the SSO settings service
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for SSO settings operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the SSO settings service
#[derive(Error, Debug)]
pub enum Error {
    /// The provider has no persisted settings record
    #[error("SSO settings not found: {0}")]
    NotFound(String),

    /// The provider is not in the configurable-providers allow-list
    #[error("provider {0} is not configurable")]
    NotConfigurable(String),

    /// No reload target is registered for the provider
    #[error("provider {0} has no registered reload target")]
    ProviderNotConfigurable(String),

    /// Zero or more than one fallback strategy claimed the provider
    #[error("expected exactly one fallback strategy for provider {provider}, found {claims}")]
    NoMatchingFallback {
        /// Provider name
        provider: String,
        /// Number of strategies that claimed it
        claims: usize,
    },

    /// A reload target rejected the candidate settings
    #[error("invalid settings for provider {provider}: {message}")]
    ValidationFailed {
        /// Provider name
        provider: String,
        /// Reason given by the reload target
        message: String,
    },

    /// A secret field holds malformed base64
    #[error("secret field {field} is not valid base64: {message}")]
    InvalidEncoding {
        /// Field name
        field: String,
        /// Decoder message
        message: String,
    },

    /// A secret field holds something other than a string
    #[error("secret field {field} is not a string")]
    NotAString {
        /// Field name
        field: String,
    },

    /// The secret codec failed to encrypt a field
    #[error("failed to encrypt secret field {field}: {message}")]
    EncryptionFailed {
        /// Field name
        field: String,
        /// Codec message
        message: String,
    },

    /// The secret codec failed to decrypt a field
    #[error("failed to decrypt secret field {field}: {message}")]
    DecryptionFailed {
        /// Field name
        field: String,
        /// Codec message
        message: String,
    },

    /// Settings store errors other than a miss
    #[error("Settings store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(provider: impl Into<String>) -> Self {
        Self::NotFound(provider.into())
    }

    /// Create a settings store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error, for use by reload targets
    pub fn validation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a fallback ownership error
    pub fn no_matching_fallback(provider: impl Into<String>, claims: usize) -> Self {
        Self::NoMatchingFallback {
            provider: provider.into(),
            claims,
        }
    }

    /// Whether this is the store's not-found sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
