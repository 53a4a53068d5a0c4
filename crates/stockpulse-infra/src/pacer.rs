//! Minimum-interval pacing for outbound calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use stockpulse_core::ports::Pacer;

use crate::sweeper::Sweep;

/// Outbound pacer configuration.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Minimum gap between two calls for the same key.
    pub min_interval: Duration,
    /// How often idle keys are evicted.
    pub sweep_interval: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl PacerConfig {
    pub fn from_env() -> Self {
        Self {
            min_interval: Duration::from_millis(
                std::env::var("PACER_MIN_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("PACER_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

type Slot = Arc<Mutex<Option<Instant>>>;

/// Spaces calls per key by at least `min_interval`.
///
/// Callers for the same key queue on that key's slot, so each one observes the
/// previous caller's recorded instant. Different keys never wait on each other.
pub struct OutboundPacer {
    slots: DashMap<String, Slot>,
    min_interval: Duration,
}

impl OutboundPacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            slots: DashMap::new(),
            min_interval: config.min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, key: &str) -> Slot {
        // Clone out so the map shard lock is not held across the await
        self.slots.entry(key.to_string()).or_default().clone()
    }
}

impl Default for OutboundPacer {
    fn default() -> Self {
        Self::new(PacerConfig::default())
    }
}

#[async_trait]
impl Pacer for OutboundPacer {
    async fn wait_if_needed(&self, key: &str) -> Duration {
        let slot = self.slot(key);
        let mut last = slot.lock().await;

        let started = Instant::now();
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > started {
                tracing::debug!(
                    key = %key,
                    wait_ms = (ready_at - started).as_millis() as u64,
                    "Pacing outbound call"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        now - started
    }
}

#[async_trait]
impl Sweep for OutboundPacer {
    fn name(&self) -> &'static str {
        "pacer"
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            // Held or referenced elsewhere means a caller is using it
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(last) => last.is_some_and(|at| now.duration_since(at) < self.min_interval),
                Err(_) => true,
            }
        });
        before.saturating_sub(self.slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(ms: u64) -> Arc<OutboundPacer> {
        Arc::new(OutboundPacer::new(PacerConfig {
            min_interval: Duration::from_millis(ms),
            ..PacerConfig::default()
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let pacer = pacer(500);
        assert_eq!(pacer.wait_if_needed("acct").await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_remaining_interval() {
        let pacer = pacer(500);
        pacer.wait_if_needed("acct").await;

        tokio::time::advance(Duration::from_millis(200)).await;
        let start = Instant::now();
        let waited = pacer.wait_if_needed("acct").await;

        assert_eq!(waited, Duration::from_millis(300));
        assert_eq!(Instant::now() - start, Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let pacer = pacer(500);
        pacer.wait_if_needed("acct").await;

        tokio::time::advance(Duration::from_millis(700)).await;
        assert_eq!(pacer.wait_if_needed("acct").await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let pacer = pacer(500);
        pacer.wait_if_needed("a").await;
        assert_eq!(pacer.wait_if_needed("b").await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let pacer = pacer(500);
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = pacer.clone();
            handles.push(tokio::spawn(async move {
                pacer.wait_if_needed("acct").await;
                Instant::now()
            }));
        }

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - start);
        }
        finished.sort();

        assert_eq!(
            finished,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_idle_keys() {
        let pacer = pacer(500);
        pacer.wait_if_needed("old").await;
        tokio::time::advance(Duration::from_millis(400)).await;
        pacer.wait_if_needed("recent").await;

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(pacer.sweep().await, 1);
        assert_eq!(pacer.tracked_keys(), 1);
    }
}
