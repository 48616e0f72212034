// =============================================================================
// Mefic Analytics — quantitative analytics for a fixed universe of equities
// =============================================================================
//
// Engine (pure, synchronous):
//   series → indicators / technical → risk → relative
//   fundamentals → screener
//
// Around it: a market-data provider seam with a Yahoo Finance client, the
// orchestration service, runtime configuration and the axum REST surface.
// =============================================================================

pub mod api;
pub mod app_state;
pub mod error;
pub mod fundamentals;
pub mod indicators;
pub mod market_data;
pub mod period;
pub mod relative;
pub mod risk;
pub mod runtime_config;
pub mod screener;
pub mod series;
pub mod service;
pub mod stats;
pub mod technical;
pub mod types;

pub use error::{AnalyticsError, AnalyticsResult};
