//! Secret field classification and transforms
//!
//! Secret fields are stored as base64 (standard alphabet, no padding) of the
//! codec's ciphertext. This module owns the three ways a settings record's
//! secrets are handled:
//!
//! - **decrypt**: persisted ciphertext → plaintext, for internal consumers
//! - **redact**: any non-empty secret → [`REDACTED_MARKER`], for display
//! - **delta**: submitted values → ciphertext to persist, reusing the prior
//!   ciphertext wherever the caller sent [`UNCHANGED_MARKER`]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::FieldMap;
use crate::traits::{SecretCodec, SecretContext};

/// Marker shown in place of secret values on redacted read paths
pub const REDACTED_MARKER: &str = "*********";

/// Sentinel a caller submits to keep a secret as it is
///
/// Identical to [`REDACTED_MARKER`] so a redacted read can be sent straight
/// back as an update.
pub const UNCHANGED_MARKER: &str = REDACTED_MARKER;

const SECRET_SUFFIXES: [&str; 3] = ["_secret", "_private_key", "_certificate"];

/// Recognized secret fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretField {
    /// `client_secret`
    ClientSecret,
    /// `secret`
    Secret,
    /// `private_key`
    PrivateKey,
    /// `certificate`
    Certificate,
    /// Any field whose name ends in a recognized secret suffix
    SuffixConvention,
}

/// Classification of a settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Secret material subject to encryption and redaction
    Secret(SecretField),
    /// Provider-specific field passed through untouched
    Opaque,
}

/// Classify a field by name (case-insensitive)
pub fn classify(name: &str) -> FieldKind {
    let name = name.to_ascii_lowercase();
    let known = match name.as_str() {
        "client_secret" => Some(SecretField::ClientSecret),
        "secret" => Some(SecretField::Secret),
        "private_key" => Some(SecretField::PrivateKey),
        "certificate" => Some(SecretField::Certificate),
        _ => None,
    };

    match known {
        Some(field) => FieldKind::Secret(field),
        None if SECRET_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) => {
            FieldKind::Secret(SecretField::SuffixConvention)
        }
        None => FieldKind::Opaque,
    }
}

/// Whether a field holds secret material
pub fn is_secret_field(name: &str) -> bool {
    matches!(classify(name), FieldKind::Secret(_))
}

/// Replace every non-empty secret value with [`REDACTED_MARKER`]
///
/// Never touches the codec.
pub fn redact_secrets(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .map(|(key, value)| {
            let value = if is_secret_field(key) && !crate::model::is_empty_value(value) {
                Value::String(REDACTED_MARKER.to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Result of resolving submitted secrets against the prior record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecretDelta {
    /// Fields to persist; secrets hold base64 ciphertext
    pub persisted: FieldMap,
    /// Same fields with every secret in plaintext
    pub plaintext: FieldMap,
}

/// Codec-backed secret transforms
#[derive(Clone)]
pub struct SecretTransform {
    codec: Arc<dyn SecretCodec>,
}

impl SecretTransform {
    /// Create a transform engine over a codec
    pub fn new(codec: Arc<dyn SecretCodec>) -> Self {
        Self { codec }
    }

    /// Decrypt every non-empty secret field of a persisted record
    ///
    /// # Errors
    ///
    /// - `NotAString`: a secret field holds a non-string value
    /// - `InvalidEncoding`: a secret field is not valid base64
    /// - `DecryptionFailed`: the codec rejected the ciphertext
    pub async fn decrypt_secrets(&self, provider: &str, fields: &FieldMap) -> Result<FieldMap> {
        let context = SecretContext::for_provider(provider);
        let mut out = FieldMap::with_capacity(fields.len());

        for (key, value) in fields {
            if !is_secret_field(key) {
                out.insert(key.clone(), value.clone());
                continue;
            }

            let value = match value {
                Value::Null => Value::Null,
                Value::String(encoded) if encoded.is_empty() => value.clone(),
                Value::String(encoded) => {
                    Value::String(self.decrypt_value(key, encoded, &context).await?)
                }
                _ => return Err(Error::NotAString { field: key.clone() }),
            };
            out.insert(key.clone(), value);
        }

        Ok(out)
    }

    /// Resolve submitted fields into ciphertext to persist
    ///
    /// For each secret field:
    /// - [`UNCHANGED_MARKER`]: the prior ciphertext is reused byte for byte
    ///   and decrypted only for the plaintext view; with no prior value the
    ///   field becomes empty
    /// - empty or null: kept as is, no codec call
    /// - anything else: encrypted and base64-encoded
    pub async fn resolve_secret_delta(
        &self,
        provider: &str,
        submitted: &FieldMap,
        prior: Option<&FieldMap>,
    ) -> Result<SecretDelta> {
        let context = SecretContext::for_provider(provider);
        let mut delta = SecretDelta::default();

        for (key, value) in submitted {
            if !is_secret_field(key) {
                delta.persisted.insert(key.clone(), value.clone());
                delta.plaintext.insert(key.clone(), value.clone());
                continue;
            }

            let (persisted, plaintext) = match value {
                Value::Null => (Value::Null, Value::Null),
                Value::String(s) if s == UNCHANGED_MARKER => {
                    match prior.and_then(|fields| fields.get(key)) {
                        Some(Value::String(current)) if !current.is_empty() => {
                            debug!(provider, field = %key, "Keeping current secret");
                            let plaintext = self.decrypt_value(key, current, &context).await?;
                            (Value::String(current.clone()), Value::String(plaintext))
                        }
                        Some(Value::String(_)) | Some(Value::Null) | None => {
                            (Value::String(String::new()), Value::String(String::new()))
                        }
                        Some(_) => return Err(Error::NotAString { field: key.clone() }),
                    }
                }
                Value::String(s) if s.is_empty() => (value.clone(), value.clone()),
                Value::String(s) => {
                    let encoded = self.encrypt_value(key, s, &context).await?;
                    (Value::String(encoded), value.clone())
                }
                _ => return Err(Error::NotAString { field: key.clone() }),
            };

            delta.persisted.insert(key.clone(), persisted);
            delta.plaintext.insert(key.clone(), plaintext);
        }

        Ok(delta)
    }

    /// Encrypt one plaintext value into its stored form
    pub async fn encrypt_value(
        &self,
        field: &str,
        plaintext: &str,
        context: &SecretContext,
    ) -> Result<String> {
        let ciphertext = self
            .codec
            .encrypt(plaintext.as_bytes(), context)
            .await
            .map_err(|e| Error::EncryptionFailed {
                field: field.to_string(),
                message: e.to_string(),
            })?;

        Ok(STANDARD_NO_PAD.encode(ciphertext))
    }

    /// Decode and decrypt one stored value
    pub async fn decrypt_value(
        &self,
        field: &str,
        encoded: &str,
        context: &SecretContext,
    ) -> Result<String> {
        let ciphertext = STANDARD_NO_PAD
            .decode(encoded)
            .map_err(|e| Error::InvalidEncoding {
                field: field.to_string(),
                message: e.to_string(),
            })?;

        let plaintext = self
            .codec
            .decrypt(&ciphertext, context)
            .await
            .map_err(|e| Error::DecryptionFailed {
                field: field.to_string(),
                message: e.to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|_| Error::DecryptionFailed {
            field: field.to_string(),
            message: "plaintext is not valid UTF-8".to_string(),
        })
    }
}
