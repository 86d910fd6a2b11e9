// =============================================================================
// QuantDesk Market Data API — Main Entry Point
// =============================================================================
//
// Startup order matters: the engine's start() returns immediately and warm-up
// (backfill + stream connect) continues in the background, so the HTTP server
// is reachable and health checks pass while series are still filling.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod api;
mod config;
mod exchange;
mod market_data;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::market_data::MarketDataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    info!(
        symbols = ?settings.symbols,
        intervals = ?settings.intervals,
        history_limit = settings.history_limit,
        "QuantDesk backend starting"
    );

    // ── 2. Market data engine ────────────────────────────────────────────
    let service = Arc::new(MarketDataService::new(settings.clone()));
    service.start();

    // ── 3. REST API server ───────────────────────────────────────────────
    let app = api::rest::router(service.clone());
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    service.stop().await;
    info!("QuantDesk backend shut down complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    warn!("shutdown signal received; stopping gracefully");
}
