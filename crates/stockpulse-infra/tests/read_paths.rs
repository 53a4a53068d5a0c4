mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use stockpulse_core::domain::{Alert, AlertKind, InventoryRecord, StockStatus};
use stockpulse_core::keys;
use stockpulse_core::ports::{AlertRepository, Cache, CacheExt, InventoryRepository};
use stockpulse_core::services::SessionData;
use stockpulse_core::{InventoryReader, SessionStore};
use stockpulse_infra::{InMemoryCache, InMemoryInventoryStore};

use common::{BrokenCache, raw};

fn session(value: serde_json::Value) -> SessionData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("session payload must be an object, got {other}"),
    }
}

fn record(account: &str, ext: &str, quantity: i64) -> InventoryRecord {
    InventoryRecord::new(account, raw(ext, quantity).validate().unwrap(), 10)
}

#[tokio::test(start_paused = true)]
async fn test_session_lifecycle() {
    let store = SessionStore::new(Arc::new(InMemoryCache::new()), Duration::from_secs(60));

    assert!(store.create("s1", session(json!({"user": "ana", "role": "viewer"}))).await);
    assert_eq!(store.get("s1").await.unwrap()["user"], "ana");

    assert!(store.update("s1", session(json!({"role": "admin", "theme": "dark"}))).await);
    let data = store.get("s1").await.unwrap();
    assert_eq!(data["user"], "ana");
    assert_eq!(data["role"], "admin");
    assert_eq!(data["theme"], "dark");

    assert!(!store.update("missing", session(json!({"x": 1}))).await);
    assert!(store.get("missing").await.is_none());

    assert!(store.delete("s1").await);
    assert!(!store.delete("s1").await);
    assert!(store.get("s1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_read_slides_expiry() {
    let store = SessionStore::new(Arc::new(InMemoryCache::new()), Duration::from_secs(60));
    store.create("s1", session(json!({"user": "ana"}))).await;

    tokio::time::advance(Duration::from_secs(45)).await;
    assert!(store.get("s1").await.is_some());

    // Past the original expiry, within the slid one
    tokio::time::advance(Duration::from_secs(45)).await;
    assert!(store.get("s1").await.is_some());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(store.get("s1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_extend() {
    let store = SessionStore::new(Arc::new(InMemoryCache::new()), Duration::from_secs(60));
    store.create("s1", session(json!({"user": "ana"}))).await;

    tokio::time::advance(Duration::from_secs(50)).await;
    assert!(store.extend("s1").await);
    tokio::time::advance(Duration::from_secs(50)).await;
    assert!(store.get("s1").await.is_some());

    assert!(!store.extend("missing").await);
}

#[tokio::test]
async fn test_session_store_fails_soft() {
    let store = SessionStore::new(Arc::new(BrokenCache), SessionStore::DEFAULT_TTL);

    assert!(!store.create("s1", session(json!({"user": "ana"}))).await);
    assert!(store.get("s1").await.is_none());
    assert!(!store.delete("s1").await);
    assert!(!store.extend("s1").await);
}

#[tokio::test]
async fn test_reader_populates_then_serves_from_cache() {
    let cache = Arc::new(InMemoryCache::new());
    let store = Arc::new(InMemoryInventoryStore::new());
    let reader = InventoryReader::new(cache.clone(), store.clone(), store.clone(), InventoryReader::DEFAULT_TTL);

    store.upsert(record("acct", "a", 0)).await.unwrap();
    store.upsert(record("acct", "b", 30)).await.unwrap();

    let listed = reader.list("acct").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(cache.exists(&keys::inventory_list("acct")).await);

    // A write behind the cache's back stays invisible until invalidation
    store.upsert(record("acct", "c", 30)).await.unwrap();
    assert_eq!(reader.list("acct").await.unwrap().len(), 2);

    cache.delete_by_pattern(&keys::inventory_views_pattern("acct")).await.unwrap();
    assert_eq!(reader.list("acct").await.unwrap().len(), 3);

    let out = reader.list_by_status("acct", StockStatus::OutOfStock).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].external_id, "a");
}

#[tokio::test]
async fn test_reader_get_does_not_cache_misses() {
    let cache = Arc::new(InMemoryCache::new());
    let store = Arc::new(InMemoryInventoryStore::new());
    let reader = InventoryReader::new(cache.clone(), store.clone(), store.clone(), InventoryReader::DEFAULT_TTL);

    assert!(reader.get("acct", "a").await.unwrap().is_none());
    assert!(!cache.exists(&keys::inventory_item("acct", "a")).await);

    store.upsert(record("acct", "a", 4)).await.unwrap();
    let found = reader.get("acct", "a").await.unwrap().unwrap();
    assert_eq!(found.quantity, 4);

    let cached: InventoryRecord = cache
        .get_json(&keys::inventory_item("acct", "a"))
        .await
        .unwrap();
    assert_eq!(cached, found);
}

#[tokio::test]
async fn test_reader_active_alerts() {
    let cache = Arc::new(InMemoryCache::new());
    let store = Arc::new(InMemoryInventoryStore::new());
    let reader = InventoryReader::new(cache.clone(), store.clone(), store.clone(), InventoryReader::DEFAULT_TTL);

    let rec = record("acct", "a", 0);
    store.raise(Alert::new(&rec, AlertKind::OutOfStock)).await.unwrap();

    let active = reader.active_alerts("acct").await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(cache.exists(&keys::active_alerts("acct")).await);
}

#[tokio::test]
async fn test_reader_survives_cache_outage() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let reader = InventoryReader::new(Arc::new(BrokenCache), store.clone(), store.clone(), InventoryReader::DEFAULT_TTL);

    store.upsert(record("acct", "a", 20)).await.unwrap();

    assert_eq!(reader.list("acct").await.unwrap().len(), 1);
    assert!(reader.get("acct", "a").await.unwrap().is_some());
}
