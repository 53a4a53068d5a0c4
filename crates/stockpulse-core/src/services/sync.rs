//! Inventory synchronization engine.
//!
//! One pass pulls every page of an account's inventory from the external
//! source, upserts the records locally, classifies their stock status, raises
//! or resolves shortage alerts, and finally invalidates the cached views that
//! the pass made stale.
//!
//! Error policy:
//! - a malformed or undecodable record, or a failed write for a single record,
//!   is skipped and counted;
//! - a failed page fetch aborts the rest of the pass;
//! - an unreachable store aborts the pass.
//!
//! Aborts carry the partial [`SyncSummary`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::{Alert, AlertKind, ExternalInventoryRecord, InventoryRecord, ValidatedRecord};
use crate::error::{RepoError, SyncError};
use crate::keys;
use crate::ports::{
    AlertRepository, Cache, InventoryRepository, InventorySource, Pacer, RaiseOutcome,
    ResolveOutcome, SourceError, SourcePage, UpsertOutcome,
};

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records requested per page.
    pub page_size: u32,
    /// Upper bound on a single page fetch.
    pub fetch_timeout: Duration,
    /// Threshold for records that carry none and have no local value yet.
    pub default_reorder_threshold: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 250,
            fetch_timeout: Duration::from_secs(30),
            default_reorder_threshold: 10,
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub pages: u32,
    /// Every record seen, skipped ones included.
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub alerts_raised: u32,
    pub alerts_resolved: u32,
    pub duration_ms: u64,
}

impl SyncSummary {
    /// Records written to the store.
    pub fn upserted(&self) -> u32 {
        self.created + self.updated
    }
}

/// Why a pass stopped early.
enum Abort {
    Transient(String),
    Fatal(String),
    Persistence(String),
}

impl Abort {
    fn into_error(self, account_id: &str, summary: SyncSummary) -> SyncError {
        let account_id = account_id.to_string();
        match self {
            Abort::Transient(reason) => SyncError::Transient {
                account_id,
                reason,
                summary,
            },
            Abort::Fatal(reason) => SyncError::SyncFailed {
                account_id,
                reason,
                summary,
            },
            Abort::Persistence(reason) => SyncError::PersistenceUnavailable {
                account_id,
                reason,
                summary,
            },
        }
    }
}

/// Mutable state of one pass.
struct Pass<'a> {
    account_id: &'a str,
    summary: SyncSummary,
    /// External ids whose cached item views are stale.
    changed: Vec<String>,
}

/// Keeps local inventory in step with the external source, one account at a time.
pub struct SyncEngine {
    source: Arc<dyn InventorySource>,
    records: Arc<dyn InventoryRepository>,
    alerts: Arc<dyn AlertRepository>,
    cache: Arc<dyn Cache>,
    pacer: Arc<dyn Pacer>,
    config: SyncConfig,
    account_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn InventorySource>,
        records: Arc<dyn InventoryRepository>,
        alerts: Arc<dyn AlertRepository>,
        cache: Arc<dyn Cache>,
        pacer: Arc<dyn Pacer>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            records,
            alerts,
            cache,
            pacer,
            config,
            account_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one full pass for `account_id`.
    ///
    /// Passes for the same account are serialized; a second trigger waits for
    /// the running pass and then performs its own.
    pub async fn sync_all(&self, account_id: &str) -> Result<SyncSummary, SyncError> {
        if let Err(e) = keys::validate_account_id(account_id) {
            return Err(SyncError::InvalidAccount {
                account_id: account_id.to_string(),
                reason: e.to_string(),
                summary: SyncSummary::default(),
            });
        }

        let lock = self.account_lock(account_id);
        let result = {
            let _guard = lock.lock().await;
            self.locked_pass(account_id).await
        };

        // Only the map holds the lock once no pass is running or waiting
        drop(lock);
        self.account_locks
            .remove_if(account_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn locked_pass(&self, account_id: &str) -> Result<SyncSummary, SyncError> {
        tracing::info!(account_id = %account_id, "Starting inventory sync");
        let started = Instant::now();

        let mut pass = Pass {
            account_id,
            summary: SyncSummary::default(),
            changed: Vec::new(),
        };

        let result = self.run_pass(&mut pass).await;

        // Records written before an abort are real; their views are stale either way.
        self.invalidate(&pass).await;
        pass.summary.duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                tracing::info!(
                    account_id = %account_id,
                    pages = pass.summary.pages,
                    processed = pass.summary.processed,
                    created = pass.summary.created,
                    updated = pass.summary.updated,
                    skipped = pass.summary.skipped,
                    alerts_raised = pass.summary.alerts_raised,
                    alerts_resolved = pass.summary.alerts_resolved,
                    duration_ms = pass.summary.duration_ms,
                    "Inventory sync completed"
                );
                Ok(pass.summary)
            }
            Err(abort) => {
                let err = abort.into_error(account_id, pass.summary);
                tracing::error!(
                    account_id = %account_id,
                    error = %err,
                    processed = err.summary().processed,
                    "Inventory sync aborted"
                );
                Err(err)
            }
        }
    }

    /// Sync several accounts one after another, collecting each result.
    pub async fn sync_accounts<I, S>(&self, account_ids: I) -> Vec<(String, Result<SyncSummary, SyncError>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = Vec::new();
        for account_id in account_ids {
            let account_id = account_id.as_ref();
            let result = self.sync_all(account_id).await;
            results.push((account_id.to_string(), result));
        }
        results
    }

    /// Accounts with a pass running or waiting.
    pub fn busy_accounts(&self) -> usize {
        self.account_locks.len()
    }

    fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(account_id.to_string())
            .or_default()
            .clone()
    }

    async fn run_pass(&self, pass: &mut Pass<'_>) -> Result<(), Abort> {
        let mut cursor: Option<String> = None;

        loop {
            self.pacer.wait_if_needed(pass.account_id).await;
            let page = self.fetch_page(pass.account_id, cursor.as_deref()).await?;
            pass.summary.pages += 1;

            tracing::debug!(
                account_id = %pass.account_id,
                page = pass.summary.pages,
                records = page.records.len(),
                malformed = page.malformed,
                "Fetched inventory page"
            );

            if page.malformed > 0 {
                tracing::warn!(
                    account_id = %pass.account_id,
                    count = page.malformed,
                    "Skipping undecodable inventory records"
                );
                pass.summary.processed += page.malformed;
                pass.summary.skipped += page.malformed;
            }

            for raw in page.records {
                self.process_record(pass, raw).await?;
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(Abort::Fatal(format!(
                        "source returned the same cursor twice: {next}"
                    )));
                }
                Some(next) => cursor = Some(next),
                None => return Ok(()),
            }
        }
    }

    async fn fetch_page(&self, account_id: &str, cursor: Option<&str>) -> Result<SourcePage, Abort> {
        let fetch = self
            .source
            .fetch_page(account_id, cursor, self.config.page_size);

        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(page)) => Ok(page),
            Ok(Err(SourceError::Transient(reason))) => Err(Abort::Transient(reason)),
            Ok(Err(SourceError::Fatal(reason))) => Err(Abort::Fatal(reason)),
            Err(_) => Err(Abort::Transient(format!(
                "page fetch timed out after {}ms",
                self.config.fetch_timeout.as_millis()
            ))),
        }
    }

    async fn process_record(&self, pass: &mut Pass<'_>, raw: ExternalInventoryRecord) -> Result<(), Abort> {
        pass.summary.processed += 1;

        let validated = match raw.validate() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(account_id = %pass.account_id, error = %e, "Skipping malformed inventory record");
                pass.summary.skipped += 1;
                return Ok(());
            }
        };
        let external_id = validated.external_id.clone();

        let outcome = match self.upsert(pass.account_id, validated).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_unavailable() => return Err(Abort::Persistence(e.to_string())),
            Err(e) => {
                tracing::warn!(
                    account_id = %pass.account_id,
                    external_id = %external_id,
                    error = %e,
                    "Skipping inventory record after failed upsert"
                );
                pass.summary.skipped += 1;
                return Ok(());
            }
        };

        match &outcome {
            UpsertOutcome::Created(_) => {
                pass.summary.created += 1;
                pass.changed.push(external_id);
            }
            UpsertOutcome::Updated(_) => {
                pass.summary.updated += 1;
                pass.changed.push(external_id);
            }
            UpsertOutcome::Unchanged(_) => pass.summary.unchanged += 1,
        }

        self.reconcile_alerts(pass, outcome.record()).await
    }

    async fn upsert(&self, account_id: &str, validated: ValidatedRecord) -> Result<UpsertOutcome, RepoError> {
        let existing = self
            .records
            .find_by_external_id(account_id, &validated.external_id)
            .await?;

        let threshold = validated
            .reorder_threshold
            .or(existing.as_ref().map(|r| r.reorder_threshold))
            .unwrap_or(self.config.default_reorder_threshold);

        let record = match existing {
            Some(mut record) => {
                if !record.apply(validated, threshold) {
                    return Ok(UpsertOutcome::Unchanged(record));
                }
                record
            }
            None => InventoryRecord::new(account_id, validated, threshold),
        };

        self.records.upsert(record).await
    }

    /// Bring the record's active shortage alerts in line with its status.
    async fn reconcile_alerts(&self, pass: &mut Pass<'_>, record: &InventoryRecord) -> Result<(), Abort> {
        let wanted = record.status.alert_kind();

        let active = match self.alerts.find_active(record.id).await {
            Ok(active) => active,
            Err(e) => return self.absorb_alert_error(pass, record, e),
        };

        // Recovery, or a move to the other shortage kind, ends the current one.
        let stale = active
            .iter()
            .filter(|a| AlertKind::SHORTAGES.contains(&a.kind) && Some(a.kind) != wanted);
        for alert in stale {
            match self.alerts.resolve(record.id, alert.kind, Utc::now()).await {
                Ok(ResolveOutcome::Resolved(resolved)) => {
                    pass.summary.alerts_resolved += 1;
                    tracing::info!(
                        account_id = %pass.account_id,
                        sku = %record.sku,
                        kind = %resolved.kind,
                        "Stock alert resolved"
                    );
                }
                Ok(ResolveOutcome::NotActive) => {}
                Err(e) => self.absorb_alert_error(pass, record, e)?,
            }
        }

        let Some(kind) = wanted else {
            return Ok(());
        };
        if active.iter().any(|a| a.kind == kind) {
            return Ok(());
        }

        match self.alerts.raise(Alert::new(record, kind)).await {
            Ok(RaiseOutcome::Raised(alert)) => {
                pass.summary.alerts_raised += 1;
                tracing::info!(
                    account_id = %pass.account_id,
                    sku = %record.sku,
                    kind = %alert.kind,
                    severity = alert.severity.as_str(),
                    "Stock alert raised"
                );
                Ok(())
            }
            Ok(RaiseOutcome::AlreadyActive(_)) => Ok(()),
            Err(e) => self.absorb_alert_error(pass, record, e),
        }
    }

    fn absorb_alert_error(&self, pass: &Pass<'_>, record: &InventoryRecord, e: RepoError) -> Result<(), Abort> {
        if e.is_unavailable() {
            return Err(Abort::Persistence(e.to_string()));
        }
        tracing::warn!(
            account_id = %pass.account_id,
            external_id = %record.external_id,
            error = %e,
            "Alert update failed"
        );
        Ok(())
    }

    /// Drop cached views made stale by the pass. Failures are logged only.
    async fn invalidate(&self, pass: &Pass<'_>) {
        let account_id = pass.account_id;

        for pattern in [
            keys::inventory_views_pattern(account_id),
            keys::alerts_pattern(account_id),
        ] {
            if let Err(e) = self.cache.delete_by_pattern(&pattern).await {
                tracing::warn!(pattern = %pattern, error = %e, "Cache invalidation failed");
            }
        }

        for external_id in &pass.changed {
            let key = keys::inventory_item(account_id, external_id);
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }
}
