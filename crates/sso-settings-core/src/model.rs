//! Settings record model
//!
//! A [`SettingsRecord`] holds one provider's configuration as an open
//! [`FieldMap`]. Only secret classification is modelled statically (see
//! [`crate::secrets`]); every other field is passed through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name to value mapping for one provider
///
/// Backed by `serde_json::Map` with `preserve_order`, so insertion order
/// survives the JSON encode/decode done by persistent stores.
pub type FieldMap = serde_json::Map<String, Value>;

/// Where a resolved record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The record (or its pre-merge component) was read from the store
    #[default]
    Persisted,
    /// The record was built entirely from fallback defaults
    Derived,
}

/// One provider's SSO settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Store-assigned identifier, empty until first persisted
    #[serde(default)]
    pub id: String,

    /// Provider name, the unique key
    pub provider: String,

    /// Provider-specific fields
    #[serde(default)]
    pub fields: FieldMap,

    /// Source of the record
    #[serde(default)]
    pub origin: Origin,

    /// Set by the store on first persist
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Set by the store on every persist
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Soft-delete intent carried on mutation requests
    #[serde(default)]
    pub deleted: bool,
}

impl SettingsRecord {
    /// Create a record for a provider with the given fields
    pub fn new(provider: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            provider: provider.into(),
            fields,
            ..Self::default()
        }
    }

    /// Create a record produced from fallback defaults only
    pub fn derived(provider: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            origin: Origin::Derived,
            ..Self::new(provider, fields)
        }
    }

    /// Set the origin
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether the record has been persisted at least once
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Identity of the caller performing a mutation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier
    pub id: String,
    /// Login name
    pub login: String,
    /// Whether the actor is a server administrator
    #[serde(default)]
    pub is_server_admin: bool,
}

impl Actor {
    /// Create an actor
    pub fn new(id: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            login: login.into(),
            is_server_admin: false,
        }
    }
}

/// Whether a field value counts as "not set"
///
/// `null` and the empty string are empty; `false` and `0` are real values.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("")));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn test_field_order_survives_json() {
        let mut fields = FieldMap::new();
        fields.insert("zeta".into(), json!(1));
        fields.insert("alpha".into(), json!(2));
        fields.insert("mid".into(), json!(3));
        let record = SettingsRecord::new("github", fields);

        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: SettingsRecord = serde_json::from_str(&encoded).unwrap();

        let keys: Vec<&str> = decoded.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_origin_serialization() {
        assert_eq!(serde_json::to_string(&Origin::Derived).unwrap(), "\"derived\"");
        let record = SettingsRecord::derived("okta", FieldMap::new());
        assert_eq!(record.origin, Origin::Derived);
        assert!(!record.is_persisted());
    }
}
