// =============================================================================
// Mefic Analytics — Main Entry Point
// =============================================================================
//
// Loads configuration (falling back to defaults and materialising a default
// file on first start), builds the Yahoo Finance provider and serves the REST
// API until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mefic_analytics::api;
use mefic_analytics::app_state::AppState;
use mefic_analytics::market_data::YahooFinanceClient;
use mefic_analytics::runtime_config::{AppConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Mefic Analytics v{} — starting up", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let config = AppConfig::default();
        if !std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
            if let Err(e) = config.save(DEFAULT_CONFIG_PATH) {
                error!(error = %e, "Failed to write default config");
            }
        }
        config
    });
    config.apply_env_overrides();
    config.validate().context("configuration is not usable")?;

    info!(
        bind_addr = %config.bind_addr,
        benchmark = %config.benchmark_symbol,
        symbols = config.universe.len(),
        fetch_concurrency = config.fetch_concurrency,
        "Configuration ready"
    );

    // ── 2. Market data provider & shared state ───────────────────────────
    let provider =
        YahooFinanceClient::new(config.provider_base_url.clone(), config.request_timeout())
            .context("failed to build market data client")?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, provider));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Mefic Analytics shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C — serving until killed");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received — stopping gracefully");
}
