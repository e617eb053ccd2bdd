// # Ring Secret Codec
//
// AES-256-GCM implementation of the SecretCodec trait.
//
// ## Ciphertext Layout
//
// ```text
// ┌──────────────┬──────────────────────────────┐
// │ nonce (12 B) │ ciphertext + GCM tag (16 B)  │
// └──────────────┴──────────────────────────────┘
// ```
//
// A fresh random nonce is drawn for every encryption. The provider name is
// bound as associated data, so ciphertext copied from one provider's record
// to another's fails to decrypt.
//
// ## Security Requirements
//
// - The key NEVER appears in logs or Debug output
// - The key MUST be 32 bytes, supplied base64-encoded
// - Construction fails fast on a malformed key

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sso_settings_core::{Error, Result, SecretCodec, SecretContext};

/// Required key length in bytes
pub const KEY_LEN: usize = 32;

/// Size of the AES-256-GCM tag in bytes
const TAG_LEN: usize = 16;

/// Associated data prefix; the provider name follows
const AAD_PREFIX: &str = "sso-settings:";

/// AES-256-GCM secret codec
#[derive(Clone)]
pub struct RingSecretCodec {
    key: Arc<LessSafeKey>,
    rng: Arc<SystemRandom>,
}

// Custom Debug implementation that hides the key
impl std::fmt::Debug for RingSecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingSecretCodec")
            .field("algorithm", &"AES-256-GCM")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl RingSecretCodec {
    /// Create a codec from raw key bytes
    ///
    /// # Errors
    ///
    /// `Error::Config` when the key is not exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(Error::config(format!(
                "Encryption key must be {} bytes (256 bits), got {} bytes",
                KEY_LEN,
                key.len()
            )));
        }

        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| Error::config("Failed to create encryption key"))?;

        tracing::debug!("Secret codec initialized");

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: Arc::new(SystemRandom::new()),
        })
    }

    /// Create a codec from a base64-encoded key
    ///
    /// Generate a key with: `openssl rand -base64 32`
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::config(format!("Invalid base64 in encryption key: {}", e)))?;

        Self::new(&key)
    }

    /// Generate a new random key, base64-encoded
    pub fn generate_key() -> Result<String> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| Error::Other("Failed to generate random key".to_string()))?;
        Ok(STANDARD.encode(key))
    }

    fn aad(context: &SecretContext) -> Vec<u8> {
        format!("{}{}", AAD_PREFIX, context.provider).into_bytes()
    }
}

#[async_trait]
impl SecretCodec for RingSecretCodec {
    async fn encrypt(&self, plaintext: &[u8], context: &SecretContext) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| Error::Other("Failed to generate random nonce".to_string()))?;

        let mut in_out = plaintext.to_vec();
        in_out.reserve(TAG_LEN);

        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(Self::aad(context)),
                &mut in_out,
            )
            .map_err(|_| Error::Other("Failed to encrypt secret".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8], context: &SecretContext) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Other(
                "Ciphertext too short (missing nonce or authentication tag)".to_string(),
            ));
        }

        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| Error::Other("Invalid nonce".to_string()))?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(Self::aad(context)), &mut in_out)
            .map_err(|_| Error::Other("Failed to decrypt secret (wrong key or tampered data)".to_string()))?;

        Ok(plaintext.to_vec())
    }
}
