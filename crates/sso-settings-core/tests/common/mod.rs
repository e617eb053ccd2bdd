//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the service
//! uses its collaborators: call counters, failure switches and channels
//! that surface reloads to the test.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde_json::Value;
use sso_settings_core::error::{Error, Result};
use sso_settings_core::store::MemorySettingsStore;
use sso_settings_core::traits::{FallbackStrategy, ReloadTarget, SecretCodec, SecretContext, SettingsStore};
use sso_settings_core::{
    Actor, FallbackRegistry, FieldMap, ReloadEvent, ReloadRegistry, ReloadWorker, ServiceConfig,
    SettingsRecord, SsoSettingsService, build_fallback_registry,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Build a FieldMap from a JSON object literal
pub fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().expect("fields must be a JSON object")
}

/// Stored form of a secret sealed by [`FakeCodec`]
pub fn sealed(plaintext: &str) -> String {
    STANDARD_NO_PAD.encode(format!("sealed:{}", plaintext))
}

pub fn admin() -> Actor {
    Actor::new("1", "admin")
}

/// Settings store that counts calls and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemorySettingsStore,
    pub get_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_get: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_upsert: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without counting it as an upsert call
    pub async fn seed(&self, provider: &str, value: Value) -> SettingsRecord {
        let mut record = SettingsRecord::new(provider, fields(value));
        self.inner.upsert(&mut record).await.expect("seed succeeds");
        record
    }

    /// Read a record without counting it as a get call
    pub async fn peek(&self, provider: &str) -> Option<SettingsRecord> {
        self.inner.get(provider).await.ok()
    }

    pub fn total_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.upsert_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for RecordingStore {
    async fn get(&self, provider: &str) -> Result<SettingsRecord> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::store("database is locked"));
        }
        self.inner.get(provider).await
    }

    async fn list(&self) -> Result<Vec<SettingsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::store("database is locked"));
        }
        self.inner.list().await
    }

    async fn upsert(&self, record: &mut SettingsRecord) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Error::store("disk full"));
        }
        self.inner.upsert(record).await
    }

    async fn delete(&self, provider: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(provider).await
    }
}

/// Codec whose ciphertext is `sealed:` + plaintext
#[derive(Default)]
pub struct FakeCodec {
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    pub fail_encrypt: AtomicBool,
}

impl FakeCodec {
    pub fn encrypts(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypts(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretCodec for FakeCodec {
    async fn encrypt(&self, plaintext: &[u8], _context: &SecretContext) -> Result<Vec<u8>> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(Error::Other("key unavailable".into()));
        }
        let mut out = b"sealed:".to_vec();
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8], _context: &SecretContext) -> Result<Vec<u8>> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        ciphertext
            .strip_prefix(b"sealed:")
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Other("authentication tag mismatch".into()))
    }
}

/// Fallback strategy with fixed defaults per provider
pub struct StaticStrategy {
    name: &'static str,
    defaults: HashMap<String, FieldMap>,
    pub calls: AtomicUsize,
}

impl StaticStrategy {
    pub fn new(name: &'static str, defaults: Vec<(&str, Value)>) -> Self {
        Self {
            name,
            defaults: defaults
                .into_iter()
                .map(|(provider, value)| (provider.to_string(), fields(value)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FallbackStrategy for StaticStrategy {
    fn is_match(&self, provider: &str) -> bool {
        self.defaults.contains_key(provider)
    }

    async fn provider_config(&self, provider: &str) -> Result<FieldMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.defaults
            .get(provider)
            .cloned()
            .ok_or_else(|| Error::no_matching_fallback(provider, 0))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Reload target that forwards every reloaded record to the test
pub struct ChannelTarget {
    reloads: mpsc::UnboundedSender<SettingsRecord>,
    reject_with: Option<String>,
    fail_reload: bool,
    pub validate_calls: AtomicUsize,
    pub reload_calls: AtomicUsize,
}

impl ChannelTarget {
    fn build(
        reject_with: Option<String>,
        fail_reload: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SettingsRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let target = Arc::new(Self {
            reloads: tx,
            reject_with,
            fail_reload,
            validate_calls: AtomicUsize::new(0),
            reload_calls: AtomicUsize::new(0),
        });
        (target, rx)
    }

    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SettingsRecord>) {
        Self::build(None, false)
    }

    /// Target whose reload always fails
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<SettingsRecord>) {
        Self::build(None, true)
    }

    /// Target whose validation always fails with `message`
    pub fn rejecting(message: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<SettingsRecord>) {
        Self::build(Some(message.to_string()), false)
    }

    pub fn reloads(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReloadTarget for ChannelTarget {
    async fn validate(&self, record: &SettingsRecord, _actor: &Actor) -> Result<()> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.reject_with {
            Some(message) => Err(Error::validation(record.provider.clone(), message.clone())),
            None => Ok(()),
        }
    }

    async fn reload(&self, record: &SettingsRecord) -> Result<()> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.reloads.send(record.clone());
        if self.fail_reload {
            return Err(Error::Other("connector offline".into()));
        }
        Ok(())
    }
}

/// A running service wired to test doubles
pub struct Harness {
    pub service: SsoSettingsService,
    pub worker: ReloadWorker,
    pub events: mpsc::Receiver<ReloadEvent>,
    pub store: Arc<RecordingStore>,
    pub codec: Arc<FakeCodec>,
    pub targets: Arc<ReloadRegistry>,
}

impl Harness {
    /// Service over the given fallback strategies
    pub fn new(config: ServiceConfig, fallbacks: FallbackRegistry) -> Self {
        let store = Arc::new(RecordingStore::new());
        let codec = Arc::new(FakeCodec::default());
        let targets = Arc::new(ReloadRegistry::new());

        let (service, worker, events) = SsoSettingsService::new(
            &config,
            store.clone(),
            codec.clone(),
            fallbacks,
            targets.clone(),
        )
        .expect("service construction succeeds");

        Self {
            service,
            worker,
            events,
            store,
            codec,
            targets,
        }
    }

    /// Service over the built-in strategies for `config`
    pub fn builtin(config: ServiceConfig) -> Self {
        let fallbacks = build_fallback_registry(&config);
        Self::new(config, fallbacks)
    }

    /// Register a target for `provider`
    pub fn attach(
        &self,
        provider: &str,
        (target, rx): (Arc<ChannelTarget>, mpsc::UnboundedReceiver<SettingsRecord>),
    ) -> (Arc<ChannelTarget>, mpsc::UnboundedReceiver<SettingsRecord>) {
        self.targets.register(provider, target.clone());
        (target, rx)
    }

    /// Next reload event, failing the test after two seconds
    pub async fn next_event(&mut self) -> ReloadEvent {
        tokio::time::timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for reload event")
            .expect("event channel closed")
    }
}

/// Next reloaded record, failing the test after two seconds
pub async fn next_reload(rx: &mut mpsc::UnboundedReceiver<SettingsRecord>) -> SettingsRecord {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for reload")
        .expect("reload channel closed")
}
