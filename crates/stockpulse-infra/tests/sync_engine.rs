mod common;

use std::sync::Arc;
use std::time::Duration;

use stockpulse_core::domain::{AlertKind, AlertState, StockStatus};
use stockpulse_core::keys;
use stockpulse_core::ports::{Cache, InventoryRepository, SourceError};
use stockpulse_core::{SyncConfig, SyncEngine, SyncError};
use stockpulse_infra::{InMemoryCache, InMemoryInventoryStore, OutboundPacer, PacerConfig};

use common::{BrokenCache, FlakyRecords, ScriptedSource, harness, harness_with, no_pacing, page, raw};

#[tokio::test]
async fn test_malformed_record_is_skipped_and_counted() {
    let mut missing_sku = raw("c", 4);
    missing_sku.sku = None;

    let h = harness(ScriptedSource::new(vec![Ok(page(
        vec![raw("a", 0), raw("b", 5), missing_sku],
        None,
    ))]));

    let summary = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.upserted(), 2);
    assert_eq!(summary.alerts_raised, 2);

    let a = h.store.find_by_external_id("acct", "a").await.unwrap().unwrap();
    assert_eq!(a.status, StockStatus::OutOfStock);
    let b = h.store.find_by_external_id("acct", "b").await.unwrap().unwrap();
    assert_eq!(b.status, StockStatus::LowStock);
    assert!(h.store.find_by_external_id("acct", "c").await.unwrap().is_none());
}

#[tokio::test]
async fn test_resync_does_not_duplicate_alerts() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 0), raw("b", 5)], None)),
        Ok(page(vec![raw("a", 0), raw("b", 5)], None)),
    ]));

    h.engine.sync_all("acct").await.unwrap();
    let second = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(second.unchanged, 2);
    assert_eq!(second.created, 0);
    assert_eq!(second.alerts_raised, 0);
    assert_eq!(h.store.all_alerts().await.len(), 2);
}

#[tokio::test]
async fn test_recovery_resolves_alert() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 0)], None)),
        Ok(page(vec![raw("a", 30)], None)),
    ]));

    h.engine.sync_all("acct").await.unwrap();
    let raised = h.store.all_alerts().await;
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].kind, AlertKind::OutOfStock);

    let summary = h.engine.sync_all("acct").await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.alerts_resolved, 1);
    assert_eq!(summary.alerts_raised, 0);

    let alerts = h.store.all_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].state, AlertState::Resolved);
    assert!(alerts[0].resolved_at.is_some());
    assert_eq!(alerts[0].created_at, raised[0].created_at);

    let record = h.store.find_by_external_id("acct", "a").await.unwrap().unwrap();
    assert_eq!(record.status, StockStatus::Normal);
}

#[tokio::test]
async fn test_shortage_kind_change_swaps_alert() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 0)], None)),
        Ok(page(vec![raw("a", 3)], None)),
    ]));

    h.engine.sync_all("acct").await.unwrap();
    let summary = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.alerts_resolved, 1);
    assert_eq!(summary.alerts_raised, 1);

    let record = h.store.find_by_external_id("acct", "a").await.unwrap().unwrap();
    let active: Vec<_> = h
        .store
        .all_alerts()
        .await
        .into_iter()
        .filter(|a| a.record_id == record.id && a.is_active())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].kind, AlertKind::LowStock);
}

#[tokio::test]
async fn test_overstock_raises_no_alert() {
    let mut bulky = raw("a", 120);
    bulky.reorder_threshold = Some(20);
    let h = harness(ScriptedSource::new(vec![Ok(page(vec![bulky], None))]));

    let summary = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.alerts_raised, 0);
    let record = h.store.find_by_external_id("acct", "a").await.unwrap().unwrap();
    assert_eq!(record.status, StockStatus::Overstock);
}

#[tokio::test]
async fn test_threshold_falls_back_to_stored_value() {
    let mut first = raw("a", 40);
    first.reorder_threshold = Some(50);
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![first], None)),
        Ok(page(vec![raw("a", 45)], None)),
    ]));

    h.engine.sync_all("acct").await.unwrap();
    h.engine.sync_all("acct").await.unwrap();

    let record = h.store.find_by_external_id("acct", "a").await.unwrap().unwrap();
    assert_eq!(record.reorder_threshold, 50);
    assert_eq!(record.status, StockStatus::LowStock);
}

#[tokio::test]
async fn test_follows_cursor_across_pages() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20)], Some("c1"))),
        Ok(page(vec![raw("b", 20)], Some("c2"))),
        Ok(page(vec![raw("c", 20)], None)),
    ]));

    let summary = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.created, 3);
    assert_eq!(h.source.calls(), 3);
}

#[tokio::test]
async fn test_page_failure_keeps_partial_summary() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20), raw("b", 20)], Some("c1"))),
        Err(SourceError::Fatal("401 Unauthorized".into())),
    ]));

    let err = h.engine.sync_all("acct").await.unwrap_err();

    assert!(matches!(err, SyncError::SyncFailed { .. }));
    assert!(!err.is_transient());
    assert_eq!(err.account_id(), "acct");
    assert_eq!(err.summary().pages, 1);
    assert_eq!(err.summary().processed, 2);
    assert_eq!(err.summary().created, 2);

    // Work done before the abort stays
    assert!(h.store.find_by_external_id("acct", "b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_transient_page_failure() {
    let h = harness(ScriptedSource::new(vec![Err(SourceError::Transient(
        "429 Too Many Requests".into(),
    ))]));

    let err = h.engine.sync_all("acct").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.summary().processed, 0);
}

#[tokio::test]
async fn test_repeated_cursor_aborts() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20)], Some("same"))),
        Ok(page(vec![raw("b", 20)], Some("same"))),
        Ok(page(vec![raw("c", 20)], Some("same"))),
    ]));

    let err = h.engine.sync_all("acct").await.unwrap_err();

    assert!(matches!(err, SyncError::SyncFailed { .. }));
    assert_eq!(err.summary().pages, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out_as_transient() {
    let config = SyncConfig {
        fetch_timeout: Duration::from_secs(1),
        ..SyncConfig::default()
    };
    let h = harness_with(
        ScriptedSource::new(vec![Ok(page(vec![raw("a", 20)], None))])
            .with_delay(Duration::from_secs(60)),
        config,
    );

    let err = h.engine.sync_all("acct").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.summary().pages, 0);
}

#[tokio::test]
async fn test_failed_write_skips_only_that_record() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let records = Arc::new(FlakyRecords::new(store.clone(), "b", false));
    let engine = SyncEngine::new(
        Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![raw("a", 20), raw("b", 20), raw("c", 20)],
            None,
        ))])),
        records,
        store.clone(),
        Arc::new(InMemoryCache::new()),
        no_pacing(),
        SyncConfig::default(),
    );

    let summary = engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_unreachable_store_aborts_pass() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let records = Arc::new(FlakyRecords::new(store.clone(), "b", true));
    let engine = SyncEngine::new(
        Arc::new(ScriptedSource::new(vec![Ok(page(
            vec![raw("a", 20), raw("b", 20), raw("c", 20)],
            None,
        ))])),
        records,
        store.clone(),
        Arc::new(InMemoryCache::new()),
        no_pacing(),
        SyncConfig::default(),
    );

    let err = engine.sync_all("acct").await.unwrap_err();

    assert!(matches!(err, SyncError::PersistenceUnavailable { .. }));
    assert_eq!(err.summary().processed, 2);
    assert_eq!(err.summary().created, 1);
}

#[tokio::test]
async fn test_cache_outage_does_not_fail_sync() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let engine = SyncEngine::new(
        Arc::new(ScriptedSource::new(vec![Ok(page(vec![raw("a", 0)], None))])),
        store.clone(),
        store.clone(),
        Arc::new(BrokenCache),
        no_pacing(),
        SyncConfig::default(),
    );

    let summary = engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.alerts_raised, 1);
}

#[tokio::test]
async fn test_sync_invalidates_account_views() {
    let h = harness(ScriptedSource::new(vec![Ok(page(vec![raw("a", 0)], None))]));

    let stale = [
        keys::inventory_list("acct"),
        keys::inventory_by_status("acct", StockStatus::OutOfStock),
        keys::inventory_item("acct", "a"),
        keys::active_alerts("acct"),
    ];
    for key in &stale {
        h.cache.set(key, "[]", None).await.unwrap();
    }
    h.cache
        .set(&keys::inventory_list("other"), "[]", None)
        .await
        .unwrap();

    h.engine.sync_all("acct").await.unwrap();

    for key in &stale {
        assert!(!h.cache.exists(key).await, "{key} should be invalidated");
    }
    assert!(h.cache.exists(&keys::inventory_list("other")).await);
}

#[tokio::test]
async fn test_aborted_pass_still_invalidates() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20)], Some("c1"))),
        Err(SourceError::Transient("connection reset".into())),
    ]));
    h.cache
        .set(&keys::inventory_item("acct", "a"), "{}", None)
        .await
        .unwrap();

    assert!(h.engine.sync_all("acct").await.is_err());
    assert!(!h.cache.exists(&keys::inventory_item("acct", "a")).await);
}

#[tokio::test(start_paused = true)]
async fn test_same_account_passes_are_serialized() {
    let h = harness(
        ScriptedSource::new(vec![
            Ok(page(vec![raw("a", 20)], None)),
            Ok(page(vec![raw("a", 20)], None)),
        ])
        .with_delay(Duration::from_millis(200)),
    );

    let first = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.sync_all("acct").await })
    };
    let second = {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.sync_all("acct").await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(h.source.max_in_flight(), 1);
    assert_eq!(first.created + second.created, 1);
    assert_eq!(first.unchanged + second.unchanged, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pages_are_paced() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20)], Some("c1"))),
        Ok(page(vec![raw("b", 20)], Some("c2"))),
        Ok(page(vec![raw("c", 20)], None)),
    ]));
    let store = Arc::new(InMemoryInventoryStore::new());
    let engine = SyncEngine::new(
        source,
        store.clone(),
        store,
        Arc::new(InMemoryCache::new()),
        Arc::new(OutboundPacer::new(PacerConfig {
            min_interval: Duration::from_millis(500),
            ..PacerConfig::default()
        })),
        SyncConfig::default(),
    );

    let started = tokio::time::Instant::now();
    engine.sync_all("acct").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test]
async fn test_sync_accounts_reports_each_account() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 20)], None)),
        Err(SourceError::Fatal("404 Not Found".into())),
    ]));

    let results = h.engine.sync_accounts(["north", "south"]).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "north");
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, "south");
    assert!(matches!(results[1].1, Err(SyncError::SyncFailed { .. })));
}

#[tokio::test]
async fn test_undecodable_records_are_skipped_not_fatal() {
    let mut mixed = page(vec![raw("a", 3), raw("c", 40)], None);
    mixed.malformed = 1;
    let h = harness(ScriptedSource::new(vec![Ok(mixed)]));

    let summary = h.engine.sync_all("acct").await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.upserted(), 2);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_unsafe_account_ids_are_rejected_before_fetching() {
    for account in ["shop[1]", "shop[", "a*", "a/b", ""] {
        let h = harness(ScriptedSource::new(vec![Ok(page(vec![raw("a", 3)], None))]));

        let err = h.engine.sync_all(account).await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidAccount { .. }), "{account}");
        assert_eq!(err.summary().processed, 0);
        assert_eq!(h.source.calls(), 0);
    }
}

#[tokio::test]
async fn test_account_lock_released_after_pass() {
    let h = harness(ScriptedSource::new(vec![
        Ok(page(vec![raw("a", 3)], None)),
        Err(SourceError::Fatal("401".into())),
    ]));

    h.engine.sync_all("north").await.unwrap();
    assert_eq!(h.engine.busy_accounts(), 0);

    h.engine.sync_all("south").await.unwrap_err();
    assert_eq!(h.engine.busy_accounts(), 0);
}

#[tokio::test]
async fn test_unchanged_record_is_not_rewritten() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let records = Arc::new(FlakyRecords::new(store.clone(), "never", false));
    let engine = SyncEngine::new(
        Arc::new(ScriptedSource::new(vec![
            Ok(page(vec![raw("a", 3), raw("b", 20)], None)),
            Ok(page(vec![raw("a", 3), raw("b", 21)], None)),
        ])),
        records.clone(),
        store.clone(),
        Arc::new(InMemoryCache::new()),
        no_pacing(),
        SyncConfig::default(),
    );

    engine.sync_all("acct").await.unwrap();
    let second = engine.sync_all("acct").await.unwrap();

    assert_eq!(second.unchanged, 1);
    assert_eq!(second.updated, 1);
    assert_eq!(records.writes(), 3);
}
