//! Application state - shared across all handlers.

use std::sync::Arc;

#[cfg(not(feature = "http-source"))]
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stockpulse_core::ports::{AlertRepository, Cache, InventoryRepository, InventorySource, RateLimiter};
#[cfg(not(feature = "http-source"))]
use stockpulse_core::ports::{SourceError, SourcePage};
use stockpulse_core::{InventoryReader, SessionStore, SyncEngine};
use stockpulse_infra::{
    CacheConfig, InMemoryCache, InMemoryInventoryStore, OutboundPacer, PacerConfig,
    RateLimitConfig, SlidingWindowRateLimiter, spawn_sweeper,
};

#[cfg(feature = "postgres")]
use stockpulse_infra::{DatabaseConnections, PostgresAlertRepository, PostgresInventoryRepository};
#[cfg(feature = "redis")]
use stockpulse_infra::{RedisCache, RedisConfig, RedisRateLimitConfig, RedisRateLimiter};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub reader: Arc<InventoryReader>,
    pub sessions: SessionStore,
    pub limiter: Arc<dyn RateLimiter>,
    pub alerts: Arc<dyn AlertRepository>,
}

/// Stand-in used when the binary is built without an external source client.
#[cfg(not(feature = "http-source"))]
pub struct UnconfiguredSource;

#[cfg(not(feature = "http-source"))]
#[async_trait]
impl InventorySource for UnconfiguredSource {
    async fn fetch_page(
        &self,
        _account_id: &str,
        _cursor: Option<&str>,
        _limit: u32,
    ) -> Result<SourcePage, SourceError> {
        Err(SourceError::Fatal(
            "no inventory source configured (build with http-source)".to_string(),
        ))
    }
}

impl AppState {
    /// Assemble services from components, without touching the environment.
    pub fn from_parts(
        config: &AppConfig,
        source: Arc<dyn InventorySource>,
        records: Arc<dyn InventoryRepository>,
        alerts: Arc<dyn AlertRepository>,
        cache: Arc<dyn Cache>,
        limiter: Arc<dyn RateLimiter>,
        pacer: Arc<OutboundPacer>,
    ) -> Self {
        let engine = SyncEngine::new(
            source,
            records.clone(),
            alerts.clone(),
            cache.clone(),
            pacer,
            config.sync.clone(),
        );
        let reader = InventoryReader::new(cache.clone(), records, alerts.clone(), config.read_cache_ttl);
        let sessions = SessionStore::new(cache, config.session_ttl);

        Self {
            engine: Arc::new(engine),
            reader: Arc::new(reader),
            sessions,
            limiter,
            alerts,
        }
    }

    /// Build the application state with appropriate implementations.
    ///
    /// Sweep tasks for in-memory components stop when `shutdown` is cancelled;
    /// their handles are returned so the caller can wait for them.
    pub async fn build(
        config: &AppConfig,
        shutdown: CancellationToken,
    ) -> anyhow::Result<(Self, Vec<JoinHandle<()>>)> {
        let mut sweepers = Vec::new();
        let cache_config = CacheConfig::from_env();

        let (cache, shared_backend) = build_cache(&cache_config, &shutdown, &mut sweepers).await?;
        let limiter = build_limiter(shared_backend, &shutdown, &mut sweepers).await?;
        let (records, alerts) = build_store(config).await;
        let source = build_source()?;

        let pacer_config = PacerConfig::from_env();
        let pacer = Arc::new(OutboundPacer::new(pacer_config.clone()));
        sweepers.push(spawn_sweeper(pacer.clone(), pacer_config.sweep_interval, shutdown.clone()));

        let state = Self::from_parts(config, source, records, alerts, cache, limiter, pacer);
        tracing::info!(sweepers = sweepers.len(), "Application state initialized");

        Ok((state, sweepers))
    }
}

/// Redis when reachable, otherwise the in-memory fallback. The flag tells
/// whether a shared backend is in use.
async fn build_cache(
    config: &CacheConfig,
    shutdown: &CancellationToken,
    sweepers: &mut Vec<JoinHandle<()>>,
) -> anyhow::Result<(Arc<dyn Cache>, bool)> {
    #[cfg(feature = "redis")]
    {
        let redis = RedisConfig::from_env();
        match RedisCache::new(redis.clone(), config.namespace.clone()).await {
            Ok(cache) => return Ok((Arc::new(cache), true)),
            Err(e) if redis.fallback_to_memory => {
                tracing::warn!(error = %e, "Redis unavailable. Falling back to in-memory cache.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let cache = Arc::new(InMemoryCache::with_config(config));
    sweepers.push(spawn_sweeper(cache.clone(), config.sweep_interval, shutdown.clone()));
    Ok((cache, false))
}

async fn build_limiter(
    shared_backend: bool,
    shutdown: &CancellationToken,
    sweepers: &mut Vec<JoinHandle<()>>,
) -> anyhow::Result<Arc<dyn RateLimiter>> {
    #[cfg(feature = "redis")]
    {
        if shared_backend {
            match RedisRateLimiter::new(RedisRateLimitConfig::from_env()).await {
                Ok(limiter) => return Ok(Arc::new(limiter)),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis rate limiter unavailable. Using in-memory limiter.");
                }
            }
        }
    }
    #[cfg(not(feature = "redis"))]
    let _ = shared_backend;

    let config = RateLimitConfig::from_env();
    let sweep_interval = config.sweep_interval;
    let limiter = Arc::new(SlidingWindowRateLimiter::new(config)?);
    sweepers.push(spawn_sweeper(limiter.clone(), sweep_interval, shutdown.clone()));
    Ok(limiter)
}

async fn build_store(config: &AppConfig) -> (Arc<dyn InventoryRepository>, Arc<dyn AlertRepository>) {
    #[cfg(feature = "postgres")]
    {
        if let Some(db_config) = &config.database {
            match DatabaseConnections::init(db_config).await {
                Ok(connections) => {
                    return (
                        Arc::new(PostgresInventoryRepository::new(connections.main.clone())),
                        Arc::new(PostgresAlertRepository::new(connections.main)),
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                }
            }
        } else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        }
    }

    #[cfg(not(feature = "postgres"))]
    {
        let _ = config;
        tracing::info!("Running without postgres feature - using in-memory store");
    }

    let store = Arc::new(InMemoryInventoryStore::new());
    (store.clone(), store)
}

fn build_source() -> anyhow::Result<Arc<dyn InventorySource>> {
    #[cfg(feature = "http-source")]
    {
        let source = stockpulse_infra::HttpInventorySource::from_env()?;
        return Ok(Arc::new(source));
    }

    #[cfg(not(feature = "http-source"))]
    {
        tracing::warn!("Built without http-source - sync requests will fail");
        return Ok(Arc::new(UnconfiguredSource));
    }
}
