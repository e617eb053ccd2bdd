//! Core traits for the SSO settings service
//!
//! This module defines the interfaces of the collaborators the service
//! coordinates but does not own.
//!
//! - [`SettingsStore`]: Persist one settings record per provider
//! - [`SecretCodec`]: Encrypt and decrypt secret material
//! - [`FallbackStrategy`]: Produce system defaults for the providers it owns
//! - [`ReloadTarget`]: A dependent subsystem that consumes resolved settings

pub mod settings_store;
pub mod secret_codec;
pub mod fallback_strategy;
pub mod reload_target;

pub use settings_store::SettingsStore;
pub use secret_codec::{SecretCodec, SecretContext};
pub use fallback_strategy::FallbackStrategy;
pub use reload_target::ReloadTarget;
