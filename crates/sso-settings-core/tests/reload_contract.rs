//! Contract Test: Reconciliation Pass and Reload Worker
//!
//! Verifies the periodic reload entry point and the worker lifecycle.
//!
//! Constraints verified:
//! - reload_all reloads each provider independently
//! - Providers without fields or without a target are skipped
//! - A failed listing reloads nothing and raises nothing
//! - Worker shutdown finishes queued jobs before returning
//! - Dropping the worker handle does not stop reloads

mod common;

use common::*;
use serde_json::json;
use sso_settings_core::{
    FallbackRegistry, Origin, ReloadEvent, ReloadRegistry, ServiceConfig, SettingsRecord,
    SsoSettingsService, build_fallback_registry,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_test::assert_ok;

#[tokio::test]
async fn reload_all_continues_past_a_failing_target() {
    let harness = Harness::builtin(ServiceConfig::new());
    let (failing, _failing_rx) = harness.attach("github", ChannelTarget::failing());
    let (okta, mut okta_rx) = harness.attach("okta", ChannelTarget::new());
    harness
        .store
        .seed("okta", json!({ "enabled": true, "client_secret": sealed("s3cret") }))
        .await;

    harness.service.reload_all().await;

    assert_eq!(failing.reloads(), 1);
    assert_eq!(okta.reloads(), 1);

    // Reconciliation hands out plaintext
    let reloaded = okta_rx.try_recv().unwrap();
    assert_eq!(reloaded.origin, Origin::Persisted);
    assert_eq!(reloaded.fields["client_secret"], json!("s3cret"));
}

#[tokio::test]
async fn reload_all_skips_empty_settings_and_unregistered_providers() {
    // gitlab resolves to no fields at all; github has no target
    let strategy = StaticStrategy::new(
        "static",
        vec![
            ("github", json!({ "client_id": "cid" })),
            ("gitlab", json!({})),
            ("google", json!({ "client_id": "gid" })),
            ("generic_oauth", json!({})),
            ("grafana_com", json!({})),
            ("azuread", json!({})),
            ("okta", json!({})),
        ],
    );
    let harness = Harness::new(ServiceConfig::new(), FallbackRegistry::new(vec![Arc::new(strategy)]));
    let (gitlab, _gitlab_rx) = harness.attach("gitlab", ChannelTarget::new());
    let (google, _google_rx) = harness.attach("google", ChannelTarget::new());

    harness.service.reload_all().await;

    assert_eq!(gitlab.reloads(), 0);
    assert_eq!(google.reloads(), 1);
}

#[tokio::test]
async fn reload_all_swallows_listing_failures() {
    let harness = Harness::builtin(ServiceConfig::new());
    let (github, _rx) = harness.attach("github", ChannelTarget::new());
    harness.store.fail_list.store(true, Ordering::SeqCst);

    harness.service.reload_all().await;

    assert_eq!(github.reloads(), 0);
    assert_eq!(harness.store.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reload_all_does_not_go_through_the_worker() {
    let mut harness = Harness::builtin(ServiceConfig::new());
    let _target = harness.attach("github", ChannelTarget::new());

    harness.service.reload_all().await;

    assert!(harness.events.try_recv().is_err());
}

#[tokio::test]
async fn shutdown_drains_queued_reloads() {
    let harness = Harness::builtin(ServiceConfig::new());
    let (target, _rx) = harness.attach("gitlab", ChannelTarget::new());

    for i in 0..3 {
        let mut record = SettingsRecord::new("gitlab", fields(json!({ "client_id": format!("cid-{i}") })));
        assert_ok!(harness.service.upsert(&mut record, &admin()).await);
    }

    let Harness {
        service,
        worker,
        mut events,
        ..
    } = harness;
    worker.shutdown().await;

    let mut applied = 0;
    while let Ok(event) = events.try_recv() {
        assert_eq!(event, ReloadEvent::Applied { provider: "gitlab".into() });
        applied += 1;
    }
    assert_eq!(applied, 3);
    assert_eq!(target.reloads(), 3);

    // Mutations after shutdown still commit; their reload is dropped
    let mut late = SettingsRecord::new("gitlab", fields(json!({ "client_id": "late" })));
    assert_ok!(service.upsert(&mut late, &admin()).await);
    assert_eq!(target.reloads(), 3);
}

#[tokio::test]
async fn dropped_worker_handle_keeps_reloading() {
    let config = ServiceConfig::new();
    let store = Arc::new(RecordingStore::new());
    let targets = Arc::new(ReloadRegistry::new());
    let (target, mut reloads) = ChannelTarget::new();
    targets.register("github", target.clone());

    let (service, _, mut events) = SsoSettingsService::new(
        &config,
        store.clone(),
        Arc::new(FakeCodec::default()),
        build_fallback_registry(&config),
        targets,
    )
    .expect("service construction succeeds");

    let mut record = SettingsRecord::new("github", fields(json!({ "enabled": true })));
    assert_ok!(service.upsert(&mut record, &admin()).await);

    let reloaded = next_reload(&mut reloads).await;
    assert_eq!(reloaded.provider, "github");
    assert_eq!(target.reloads(), 1);

    let event = tokio::time::timeout(std::time::Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for reload event");
    assert_eq!(event, Some(ReloadEvent::Applied { provider: "github".into() }));

    // Deletes are still reverted too
    assert_ok!(service.delete("github").await);
    assert_eq!(next_reload(&mut reloads).await.origin, Origin::Derived);
}
