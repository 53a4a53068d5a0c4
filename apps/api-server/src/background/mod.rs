//! Periodic inventory sync on a cron schedule.

use std::sync::Arc;

use stockpulse_core::{SyncEngine, SyncError, SyncSummary};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Runs a full sync of a fixed account list on every tick of a six-field cron
/// expression (seconds first).
///
/// Passes for one account never overlap; a tick that lands on a manual sync
/// waits for it.
pub struct SyncScheduler {
    jobs: JobScheduler,
    engine: Arc<SyncEngine>,
    accounts: Arc<Vec<String>>,
}

impl SyncScheduler {
    /// Register the sync job. Fails on an unparseable `schedule`.
    pub async fn new(
        engine: Arc<SyncEngine>,
        accounts: Vec<String>,
        schedule: &str,
    ) -> Result<Self, JobSchedulerError> {
        let accounts = Arc::new(accounts);

        let job = {
            let engine = engine.clone();
            let accounts = accounts.clone();
            Job::new_async(schedule, move |_id, _jobs| {
                let engine = engine.clone();
                let accounts = accounts.clone();
                Box::pin(async move {
                    sync_once(&engine, &accounts).await;
                })
            })?
        };

        let jobs = JobScheduler::new().await?;
        let job_id = jobs.add(job).await?;
        tracing::info!(
            schedule = %schedule,
            job_id = %job_id,
            accounts = accounts.len(),
            "Sync job registered"
        );

        Ok(Self {
            jobs,
            engine,
            accounts,
        })
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        self.jobs.start().await?;
        tracing::info!("Sync scheduler started");
        Ok(())
    }

    /// Stop ticking. A pass already running finishes on its own.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.jobs.shutdown().await?;
        tracing::info!("Sync scheduler stopped");
        Ok(())
    }

    /// Run one tick now, outside the schedule.
    pub async fn run_now(&self) -> Vec<(String, Result<SyncSummary, SyncError>)> {
        sync_once(&self.engine, &self.accounts).await
    }
}

async fn sync_once(
    engine: &SyncEngine,
    accounts: &[String],
) -> Vec<(String, Result<SyncSummary, SyncError>)> {
    tracing::info!(accounts = accounts.len(), "Scheduled sync started");

    let results = engine.sync_accounts(accounts.iter()).await;
    for (account_id, result) in &results {
        match result {
            Ok(summary) => tracing::info!(
                account_id = %account_id,
                processed = summary.processed,
                upserted = summary.upserted(),
                alerts_raised = summary.alerts_raised,
                duration_ms = summary.duration_ms,
                "Scheduled sync finished"
            ),
            Err(e) => tracing::warn!(
                account_id = %account_id,
                processed = e.summary().processed,
                transient = e.is_transient(),
                error = %e,
                "Scheduled sync failed"
            ),
        }
    }
    results
}
