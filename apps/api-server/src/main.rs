//! # StockPulse API Server
//!
//! The main entry point for the Actix-web HTTP server: sync triggers, cached
//! inventory reads and sessions.

use actix_web::{App, HttpServer, web};
use tokio_util::sync::CancellationToken;
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitMiddleware;
use middleware::request_id::RequestIdMiddleware;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        "Starting StockPulse API Server"
    );

    let shutdown = CancellationToken::new();
    let (state, sweepers) = AppState::build(&config, shutdown.clone()).await?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = start_scheduler(&config, &state).await?;

    let limiter = state.limiter.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(RateLimitMiddleware::new(limiter.clone()))
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    tracing::info!("HTTP server stopped");

    #[cfg(feature = "scheduler")]
    {
        if let Some(scheduler) = scheduler.as_mut() {
            scheduler.shutdown().await?;
        }
    }

    shutdown.cancel();
    for handle in sweepers {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Sweep task ended abnormally");
        }
    }

    Ok(())
}

/// Start the periodic sync when accounts are configured.
#[cfg(feature = "scheduler")]
async fn start_scheduler(
    config: &AppConfig,
    state: &AppState,
) -> anyhow::Result<Option<background::SyncScheduler>> {
    if config.sync_accounts.is_empty() {
        tracing::info!("SYNC_ACCOUNTS not set. Scheduled sync disabled.");
        return Ok(None);
    }

    let scheduler = background::SyncScheduler::new(
        state.engine.clone(),
        config.sync_accounts.clone(),
        &config.sync_schedule,
    )
    .await?;
    scheduler.start().await?;

    Ok(Some(scheduler))
}
