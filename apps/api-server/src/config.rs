//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use stockpulse_core::{InventoryReader, SessionStore, SyncConfig};
use stockpulse_infra::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub sync: SyncConfig,
    /// Accounts synced by the scheduled job.
    pub sync_accounts: Vec<String>,
    /// Six-field cron expression for the scheduled sync.
    pub sync_schedule: String,
    pub read_cache_ttl: Duration,
    pub session_ttl: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = SyncConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            sync: SyncConfig {
                page_size: parse_var("SYNC_PAGE_SIZE").unwrap_or(defaults.page_size),
                fetch_timeout: parse_var("SYNC_FETCH_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.fetch_timeout),
                default_reorder_threshold: parse_var("SYNC_DEFAULT_REORDER_THRESHOLD")
                    .unwrap_or(defaults.default_reorder_threshold),
            },
            sync_accounts: env::var("SYNC_ACCOUNTS")
                .map(|v| parse_accounts(&v))
                .unwrap_or_default(),
            sync_schedule: env::var("SYNC_SCHEDULE")
                .unwrap_or_else(|_| "0 */15 * * * *".to_string()),
            read_cache_ttl: parse_var("READ_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(InventoryReader::DEFAULT_TTL),
            session_ttl: parse_var("SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(SessionStore::DEFAULT_TTL),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Comma-separated account ids, blanks dropped.
fn parse_accounts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
