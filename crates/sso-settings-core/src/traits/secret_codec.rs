// # Secret Codec Trait
//
// Defines the encryption primitive used for secret fields.
//
// How secrets are protected at rest is entirely up to the implementation.
// The service only moves bytes: it base64-decodes stored values before
// `decrypt` and base64-encodes the output of `encrypt`.
//
// ## Implementations
//
// - AES-256-GCM: `sso-settings-codec-ring` crate

use async_trait::async_trait;

/// Context handed to the codec with every call
///
/// Implementations may bind ciphertext to it (for example as AEAD
/// associated data), so the same context must be used to decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretContext {
    /// Provider the secret belongs to
    pub provider: String,
}

impl SecretContext {
    /// Create a context for a provider
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

/// Trait for secret codec implementations
#[async_trait]
pub trait SecretCodec: Send + Sync {
    /// Encrypt plaintext bytes
    async fn encrypt(
        &self,
        plaintext: &[u8],
        context: &SecretContext,
    ) -> Result<Vec<u8>, crate::Error>;

    /// Decrypt ciphertext bytes produced by [`SecretCodec::encrypt`]
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &SecretContext,
    ) -> Result<Vec<u8>, crate::Error>;
}
