//! Periodic background sweeps that stop on a cancellation token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Something holding idle state that must be pruned periodically.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Drop idle state. Returns the number of entries removed.
    async fn sweep(&self) -> usize;
}

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Run `target.sweep()` every `every` until `shutdown` is cancelled.
/// Intervals under one second are raised to one second.
///
/// The first sweep happens one full interval after spawning.
pub fn spawn_sweeper<S>(target: Arc<S>, every: Duration, shutdown: CancellationToken) -> JoinHandle<()>
where
    S: Sweep + ?Sized,
{
    let every = if every < MIN_SWEEP_INTERVAL {
        tracing::warn!(
            sweeper = target.name(),
            requested_ms = every.as_millis() as u64,
            "Sweep interval too short, using 1s"
        );
        MIN_SWEEP_INTERVAL
    } else {
        every
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::debug!(sweeper = target.name(), interval_ms = every.as_millis() as u64, "Sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(sweeper = target.name(), "Sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = target.sweep().await;
                    if removed > 0 {
                        tracing::debug!(sweeper = target.name(), removed, "Swept idle entries");
                    }
                }
            }
        }
    })
}
