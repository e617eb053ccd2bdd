// # sso-settingsd - SSO Settings Daemon
//
// Thin integration layer around sso-settings-core. All reconciliation,
// secret handling and reload logic lives in the core library.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Wiring the store, codec, fallback strategies and reload targets
// 4. Running a reconciliation pass at startup and on SIGHUP
// 5. Draining the reload worker on shutdown
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Store
// - `SSO_STORE_TYPE`: Type of settings store (file, memory)
// - `SSO_STORE_PATH`: Path to settings file (for file store)
//
// ### Secrets
// - `SSO_ENCRYPTION_KEY`: Base64-encoded 32-byte key
//
// ### Providers
// - `SSO_CONFIGURABLE_PROVIDERS`: Comma-separated providers that may be mutated
// - `SSO_LICENSED_FEATURES`: Comma-separated licensed features (e.g. saml)
// - `SSO_DEFAULTS_PATH`: JSON file of per-provider system defaults
//
// ### Reload
// - `SSO_RELOAD_QUEUE_CAPACITY`: Reload job queue capacity
//
// ## Example
//
// ```bash
// export SSO_STORE_TYPE=file
// export SSO_STORE_PATH=/var/lib/sso/settings.json
// export SSO_ENCRYPTION_KEY=$(openssl rand -base64 32)
// export SSO_LICENSED_FEATURES=saml
// export SSO_CONFIGURABLE_PROVIDERS=github,gitlab,okta,saml
//
// sso-settingsd
// ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use sso_settings_core::traits::SettingsStore;
use sso_settings_core::{
    Actor, FieldMap, FileSettingsStore, MemorySettingsStore, ProviderCatalog, ReloadEvent, ReloadRegistry,
    ReloadTarget, SecretCodec, ServiceConfig, SettingsRecord, SsoSettingsService, StoreConfig,
    build_fallback_registry,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Maximum time allowed for the reload worker to drain on shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SsoExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SsoExitCode> for ExitCode {
    fn from(code: SsoExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    store_type: String,
    store_path: Option<String>,
    encryption_key: String,
    configurable_providers: Option<Vec<String>>,
    licensed_features: Vec<String>,
    defaults_path: Option<String>,
    reload_queue_capacity: Option<usize>,
    log_level: String,
}

fn comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            store_type: env::var("SSO_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("SSO_STORE_PATH").ok(),
            encryption_key: env::var("SSO_ENCRYPTION_KEY").context(
                "SSO_ENCRYPTION_KEY is required. Generate one with: openssl rand -base64 32",
            )?,
            configurable_providers: env::var("SSO_CONFIGURABLE_PROVIDERS")
                .ok()
                .map(|s| comma_list(&s)),
            licensed_features: env::var("SSO_LICENSED_FEATURES")
                .map(|s| comma_list(&s))
                .unwrap_or_default(),
            defaults_path: env::var("SSO_DEFAULTS_PATH").ok(),
            reload_queue_capacity: env::var("SSO_RELOAD_QUEUE_CAPACITY")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .context("SSO_RELOAD_QUEUE_CAPACITY must be a positive integer")?,
            log_level: env::var("SSO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the environment-level settings
    ///
    /// Provider names and capacities are validated by `ServiceConfig`.
    fn validate(&self) -> Result<()> {
        if self.encryption_key.trim().is_empty() {
            anyhow::bail!("SSO_ENCRYPTION_KEY cannot be empty");
        }

        match self.store_type.as_str() {
            "file" => match self.store_path.as_deref() {
                None | Some("") => anyhow::bail!(
                    "SSO_STORE_PATH is required when SSO_STORE_TYPE=file. \
                    Set it via: export SSO_STORE_PATH=/var/lib/sso/settings.json"
                ),
                Some(_) => {}
            },
            "memory" => {}
            _ => anyhow::bail!(
                "SSO_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SSO_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the core service configuration
    fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::new();

        if let Some(providers) = &self.configurable_providers {
            config = config.with_configurable_providers(providers.iter().cloned());
        }

        for feature in &self.licensed_features {
            config = config.with_licensed_feature(feature.clone());
        }

        if let Some(path) = &self.defaults_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read SSO_DEFAULTS_PATH {}", path))?;
            let defaults: HashMap<String, FieldMap> = serde_json::from_str(&content)
                .with_context(|| format!("SSO_DEFAULTS_PATH {} is not a provider map", path))?;

            for (provider, fields) in defaults {
                config = config.with_system_defaults(provider, fields);
            }
        }

        config.store = match self.store_type.as_str() {
            "file" => StoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
            },
            _ => StoreConfig::Memory,
        };

        if let Some(capacity) = self.reload_queue_capacity {
            config.reload.queue_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Reload target that records applied settings in the log
///
/// Stands in for the login connectors until they register their own
/// targets. Only field names are logged.
struct LoggingReloadTarget;

#[async_trait]
impl ReloadTarget for LoggingReloadTarget {
    async fn validate(&self, record: &SettingsRecord, actor: &Actor) -> sso_settings_core::Result<()> {
        debug!(provider = %record.provider, actor = %actor.login, "Validating SSO settings");
        Ok(())
    }

    async fn reload(&self, record: &SettingsRecord) -> sso_settings_core::Result<()> {
        let fields: Vec<&str> = record.fields.keys().map(String::as_str).collect();
        info!(
            provider = %record.provider,
            origin = ?record.origin,
            fields = ?fields,
            "Applied SSO settings"
        );
        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SsoExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return SsoExitCode::ConfigError.into();
    }

    let service_config = match config.service_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return SsoExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SsoExitCode::ConfigError.into();
    }

    info!("Starting sso-settingsd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SsoExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let codec = match build_codec(&config) {
            Ok(codec) => codec,
            Err(e) => {
                error!("Secret codec error: {:#}", e);
                return SsoExitCode::ConfigError;
            }
        };

        match run_daemon(service_config, codec).await {
            Ok(()) => SsoExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                SsoExitCode::RuntimeError
            }
        }
    })
    .into()
}

#[cfg(feature = "ring")]
fn build_codec(config: &Config) -> Result<Arc<dyn SecretCodec>> {
    let codec = sso_settings_codec_ring::RingSecretCodec::from_base64_key(&config.encryption_key)?;
    Ok(Arc::new(codec))
}

#[cfg(not(feature = "ring"))]
fn build_codec(_config: &Config) -> Result<Arc<dyn SecretCodec>> {
    anyhow::bail!("No secret codec compiled in. Rebuild with --features ring")
}

/// Run the daemon
async fn run_daemon(config: ServiceConfig, codec: Arc<dyn SecretCodec>) -> Result<()> {
    let store: Arc<dyn SettingsStore> = match &config.store {
        StoreConfig::File { path } => {
            info!("Using file settings store: {}", path);
            Arc::new(FileSettingsStore::new(path).await?)
        }
        StoreConfig::Memory => {
            warn!("Using memory settings store; settings will not survive a restart");
            Arc::new(MemorySettingsStore::new())
        }
    };

    let fallbacks = build_fallback_registry(&config);
    info!("Fallback strategies: {:?}", fallbacks.names());

    let catalog = ProviderCatalog::from_config(&config);
    let targets = Arc::new(ReloadRegistry::new());
    for provider in &config.configurable_providers {
        if !catalog.contains(provider) {
            warn!(provider = %provider, "Provider is configurable but not offered (unlicensed?), no reload target");
            continue;
        }
        targets.register(provider.clone(), Arc::new(LoggingReloadTarget));
    }
    info!("Reload targets: {:?}", targets.providers());

    let (service, worker, mut events) =
        SsoSettingsService::new(&config, store, codec, fallbacks, targets)?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ReloadEvent::Failed { provider, error } => {
                    warn!(provider = %provider, "Reload failed: {}", error)
                }
                other => debug!(event = ?other, "Reload event"),
            }
        }
    });

    info!("Providers: {:?}", service.providers());

    service.reload_all().await;
    info!("Initial reconciliation complete");

    wait_for_shutdown(&service).await?;

    info!("Shutting down daemon");
    drop(service);

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, worker.shutdown()).await.is_err() {
        anyhow::bail!("Reload worker did not stop within {:?}", SHUTDOWN_TIMEOUT);
    }

    if let Err(e) = event_logger.await {
        warn!("Event logger task failed: {}", e);
    }

    info!("Daemon stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT, running a reconciliation pass on every SIGHUP
#[cfg(unix)]
async fn wait_for_shutdown(service: &SsoSettingsService) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received shutdown signal: SIGTERM");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("Received shutdown signal: SIGINT");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reconciling SSO settings");
                service.reload_all().await;
            }
        }
    }
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown(_service: &SsoSettingsService) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    info!("Received shutdown signal: SIGINT");
    Ok(())
}
