// # sso-settings-core
//
// Core library for SSO settings reconciliation.
//
// ## Architecture Overview
//
// This library reconciles per-provider authentication settings drawn from
// two layers, persisted overrides and fallback defaults, and protects the
// secret fields embedded in them:
// - **SettingsStore**: Trait for persisting one record per provider
// - **SecretCodec**: Trait for encrypting/decrypting secret material
// - **FallbackStrategy**: Trait for producing a provider's defaults
// - **ReloadTarget**: Trait for subsystems that consume a provider's settings
// - **SsoSettingsService**: Reads, mutations and periodic reconciliation
// - **ReloadWorker**: Dedicated task that applies post-commit reloads
//
// ## Design Principles
//
// 1. **Injected Collaborators**: Registries are constructor arguments, not globals
// 2. **Secrets at Rest**: Secret fields are stored as base64 ciphertext only
// 3. **Commit Then Notify**: Reload failures never undo or fail a mutation
// 4. **Atomic Listings**: A listing either resolves every provider or fails

pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod registry;
pub mod reload;
pub mod secrets;
pub mod service;
pub mod store;
pub mod strategies;
pub mod traits;

// Re-export core types for convenience
pub use config::{ReloadConfig, ServiceConfig, StoreConfig};
pub use error::{Error, Result};
pub use model::{Actor, FieldMap, Origin, SettingsRecord};
pub use registry::{FallbackRegistry, ProviderCatalog, ReloadRegistry, build_fallback_registry};
pub use reload::{ReloadEvent, ReloadJob, ReloadWorker};
pub use service::SsoSettingsService;
pub use store::{FileSettingsStore, MemorySettingsStore};
pub use traits::{FallbackStrategy, ReloadTarget, SecretCodec, SecretContext, SettingsStore};
