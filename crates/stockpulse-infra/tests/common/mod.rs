//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use stockpulse_core::domain::{ExternalInventoryRecord, InventoryRecord, StockStatus};
use stockpulse_core::error::RepoError;
use stockpulse_core::ports::{
    Cache, CacheError, InventoryRepository, InventorySource, SourceError, SourcePage,
    UpsertOutcome,
};
use stockpulse_core::{SyncConfig, SyncEngine};
use stockpulse_infra::{InMemoryCache, InMemoryInventoryStore, OutboundPacer, PacerConfig};

pub fn raw(id: &str, quantity: i64) -> ExternalInventoryRecord {
    ExternalInventoryRecord {
        id: Some(id.to_string()),
        sku: Some(format!("SKU-{id}")),
        quantity: Some(quantity),
        ..Default::default()
    }
}

pub fn page(records: Vec<ExternalInventoryRecord>, next: Option<&str>) -> SourcePage {
    SourcePage {
        records,
        malformed: 0,
        next_cursor: next.map(str::to_string),
    }
}

/// Hands out scripted responses in call order, then empty last pages.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<SourcePage, SourceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<SourcePage, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<SourcePage, SourceError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventorySource for ScriptedSource {
    async fn fetch_page(
        &self,
        _account_id: &str,
        _cursor: Option<&str>,
        _limit: u32,
    ) -> Result<SourcePage, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Ok(SourcePage::default()))
    }
}

/// Cache whose every operation fails.
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Connection("cache offline".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Connection("cache offline".into()))
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::Connection("cache offline".into()))
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    async fn increment(&self, _key: &str, _amount: i64) -> Result<i64, CacheError> {
        Err(CacheError::Connection("cache offline".into()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(CacheError::Connection("cache offline".into()))
    }
}

/// Record store that fails upserts of chosen external ids and counts the rest.
pub struct FlakyRecords {
    pub inner: Arc<InMemoryInventoryStore>,
    pub fail_external_id: String,
    pub unavailable: bool,
    pub writes: AtomicUsize,
}

impl FlakyRecords {
    pub fn new(inner: Arc<InMemoryInventoryStore>, fail_external_id: &str, unavailable: bool) -> Self {
        Self {
            inner,
            fail_external_id: fail_external_id.to_string(),
            unavailable,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryRepository for FlakyRecords {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InventoryRecord>, RepoError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_external_id(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<InventoryRecord>, RepoError> {
        self.inner.find_by_external_id(account_id, external_id).await
    }

    async fn upsert(&self, record: InventoryRecord) -> Result<UpsertOutcome, RepoError> {
        if record.external_id == self.fail_external_id {
            return Err(if self.unavailable {
                RepoError::Connection("connection reset".into())
            } else {
                RepoError::Constraint("check violation".into())
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(record).await
    }

    async fn find_by_account(&self, account_id: &str) -> Result<Vec<InventoryRecord>, RepoError> {
        InventoryRepository::find_by_account(self.inner.as_ref(), account_id).await
    }

    async fn find_by_status(
        &self,
        account_id: &str,
        status: StockStatus,
    ) -> Result<Vec<InventoryRecord>, RepoError> {
        self.inner.find_by_status(account_id, status).await
    }
}

pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub source: Arc<ScriptedSource>,
    pub store: Arc<InMemoryInventoryStore>,
    pub cache: Arc<InMemoryCache>,
}

pub fn no_pacing() -> Arc<OutboundPacer> {
    Arc::new(OutboundPacer::new(PacerConfig {
        min_interval: Duration::ZERO,
        ..PacerConfig::default()
    }))
}

pub fn harness(source: ScriptedSource) -> Harness {
    harness_with(source, SyncConfig::default())
}

pub fn harness_with(source: ScriptedSource, config: SyncConfig) -> Harness {
    let source = Arc::new(source);
    let store = Arc::new(InMemoryInventoryStore::new());
    let cache = Arc::new(InMemoryCache::new());

    let engine = Arc::new(SyncEngine::new(
        source.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
        no_pacing(),
        config,
    ));

    Harness {
        engine,
        source,
        store,
        cache,
    }
}
