// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState<P>>`. Nothing here is
// mutated after startup: every analytics request recomputes from freshly
// fetched data, so the state needs no locks.
// =============================================================================

use std::time::Instant;

use serde::Serialize;

use crate::market_data::MarketDataProvider;
use crate::runtime_config::AppConfig;
use crate::service::AnalyticsService;

pub struct AppState<P> {
    pub config: AppConfig,
    pub service: AnalyticsService<P>,
    started_at: Instant,
}

/// Liveness payload served by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub universe_size: usize,
    pub benchmark: String,
    pub server_time: i64,
}

impl<P: MarketDataProvider> AppState<P> {
    pub fn new(config: AppConfig, provider: P) -> Self {
        let service = AnalyticsService::new(provider, &config);
        Self {
            config,
            service,
            started_at: Instant::now(),
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: self.started_at.elapsed().as_secs(),
            universe_size: self.service.universe().len(),
            benchmark: self.config.benchmark_symbol.clone(),
            server_time: chrono::Utc::now().timestamp_millis(),
        }
    }
}
