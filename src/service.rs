// =============================================================================
// Analytics Service — wires the market-data provider to the engine
// =============================================================================
//
// Single-symbol operations propagate any failure to the caller. Batch
// operations over the universe (comparison, screener) keep going when a
// symbol fails and report it in a side list next to the successes.
//
// Per-symbol provider calls are fanned out with `buffered(fetch_concurrency)`,
// which yields results in universe order no matter which call finishes first.
// The subject and benchmark histories of a single request are fetched
// together with `tokio::join!`.
// =============================================================================

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::fundamentals::{normalize_fundamentals, ComparisonRow, FundamentalSnapshot};
use crate::market_data::{MarketDataProvider, Universe};
use crate::period::{resolve_window, Period};
use crate::relative::{compute_relative_with, RelativePerformanceSnapshot};
use crate::risk::{compute_risk_with, RiskParams, RiskSnapshot};
use crate::runtime_config::AppConfig;
use crate::screener::{score_universe, ScreenerEntry, ScreenerWeights};
use crate::series::derive_returns;
use crate::technical::{compute_technical, TechnicalSnapshot};
use crate::types::{PricePoint, PriceSeries};

// =============================================================================
// Response records
// =============================================================================

/// Engine output for one symbol, serialised flat next to the symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMetrics<T> {
    pub symbol: String,
    #[serde(flatten)]
    pub metrics: T,
}

/// Daily price history of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockHistory {
    pub symbol: String,
    pub company_name: String,
    pub data: Vec<PricePoint>,
}

/// Fundamentals of one symbol together with its display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialMetrics {
    pub company_name: String,
    #[serde(flatten)]
    pub metrics: FundamentalSnapshot,
}

/// A symbol a batch operation had to skip, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub symbol: String,
    pub reason: String,
}

/// Result of a best-effort operation over the universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// Fold per-symbol results in order, splitting successes from failures.
    pub fn from_results(results: impl IntoIterator<Item = (String, AnalyticsResult<T>)>) -> Self {
        results
            .into_iter()
            .fold(Self::default(), |mut acc, (symbol, result)| {
                match result {
                    Ok(value) => acc.succeeded.push(value),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "skipping symbol in batch");
                        acc.failed.push(BatchFailure {
                            symbol,
                            reason: e.to_string(),
                        });
                    }
                }
                acc
            })
    }
}

// =============================================================================
// AnalyticsService
// =============================================================================

pub struct AnalyticsService<P> {
    provider: Arc<P>,
    universe: Universe,
    benchmark_symbol: String,
    params: RiskParams,
    fetch_concurrency: usize,
    default_weights: ScreenerWeights,
}

impl<P: MarketDataProvider> AnalyticsService<P> {
    pub fn new(provider: P, config: &AppConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            universe: config.universe(),
            benchmark_symbol: config.benchmark_symbol.clone(),
            params: config.risk_params(),
            fetch_concurrency: config.fetch_concurrency.max(1),
            default_weights: config.default_weights,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Display name of `symbol`, or `UnknownSymbol` outside the universe.
    pub fn company_name(&self, symbol: &str) -> AnalyticsResult<&str> {
        self.universe
            .name_of(symbol)
            .ok_or_else(|| AnalyticsError::UnknownSymbol(symbol.to_string()))
    }

    // -------------------------------------------------------------------------
    // Price-based analytics
    // -------------------------------------------------------------------------

    pub async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalyticsResult<PriceSeries> {
        self.provider.price_history(symbol, start, end).await
    }

    pub async fn benchmark_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalyticsResult<PriceSeries> {
        self.provider
            .price_history(&self.benchmark_symbol, start, end)
            .await
    }

    /// Price history over an explicit window, or the trailing `period` when
    /// the window is incomplete.
    pub async fn history(
        &self,
        symbol: &str,
        period: Period,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AnalyticsResult<StockHistory> {
        let company_name = self.company_name(symbol)?.to_string();
        let (start, end) = resolve_window(period, start, end, today())?;

        let series = self.price_history(symbol, start, end).await?;
        debug!(symbol, %start, %end, points = series.len(), "history served");

        Ok(StockHistory {
            symbol: symbol.to_string(),
            company_name,
            data: series.into_points(),
        })
    }

    pub async fn technical(
        &self,
        symbol: &str,
        period: Period,
    ) -> AnalyticsResult<SymbolMetrics<TechnicalSnapshot>> {
        self.company_name(symbol)?;
        let (start, end) = period.window_ending(today());

        let series = self.price_history(symbol, start, end).await?;
        Ok(SymbolMetrics {
            symbol: symbol.to_string(),
            metrics: compute_technical(&series),
        })
    }

    /// Risk metrics against the benchmark. A benchmark that cannot be fetched
    /// or has too little history leaves beta at its neutral value instead of
    /// failing the request.
    pub async fn risk(
        &self,
        symbol: &str,
        period: Period,
    ) -> AnalyticsResult<SymbolMetrics<RiskSnapshot>> {
        self.company_name(symbol)?;
        let (start, end) = period.window_ending(today());

        let (subject, benchmark) = tokio::join!(
            self.price_history(symbol, start, end),
            self.benchmark_history(start, end),
        );

        let returns = derive_returns(&subject?)?;
        let benchmark_returns = match benchmark.and_then(|b| derive_returns(&b)) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(
                    symbol,
                    benchmark = %self.benchmark_symbol,
                    error = %e,
                    "benchmark unavailable — beta falls back to neutral"
                );
                None
            }
        };

        let metrics = compute_risk_with(&returns, benchmark_returns.as_ref(), &self.params)?;
        Ok(SymbolMetrics {
            symbol: symbol.to_string(),
            metrics,
        })
    }

    /// Benchmark-relative performance. Unlike `risk`, this needs the
    /// benchmark and fails without it.
    pub async fn relative(
        &self,
        symbol: &str,
        period: Period,
    ) -> AnalyticsResult<SymbolMetrics<RelativePerformanceSnapshot>> {
        self.company_name(symbol)?;
        let (start, end) = period.window_ending(today());

        let (subject, benchmark) = tokio::join!(
            self.price_history(symbol, start, end),
            self.benchmark_history(start, end),
        );

        let returns = derive_returns(&subject?)?;
        let benchmark_returns = derive_returns(&benchmark?)?;

        let metrics = compute_relative_with(&returns, &benchmark_returns, &self.params)?;
        Ok(SymbolMetrics {
            symbol: symbol.to_string(),
            metrics,
        })
    }

    // -------------------------------------------------------------------------
    // Fundamentals
    // -------------------------------------------------------------------------

    pub async fn financial_metrics(&self, symbol: &str) -> AnalyticsResult<FinancialMetrics> {
        let company_name = self.company_name(symbol)?.to_string();
        let raw = self.provider.fundamentals(symbol).await?;
        Ok(FinancialMetrics {
            company_name,
            metrics: normalize_fundamentals(symbol, &raw),
        })
    }

    /// Fundamentals for every symbol in the universe, in universe order.
    pub async fn comparison(&self) -> BatchOutcome<ComparisonRow> {
        let results: Vec<(String, AnalyticsResult<ComparisonRow>)> =
            stream::iter(self.universe.entries().to_vec())
                .map(|entry| {
                    let provider = Arc::clone(&self.provider);
                    async move {
                        let row = provider.fundamentals(&entry.symbol).await.map(|raw| {
                            ComparisonRow {
                                metrics: normalize_fundamentals(&entry.symbol, &raw),
                                company: entry.name,
                            }
                        });
                        (entry.symbol, row)
                    }
                })
                .buffered(self.fetch_concurrency)
                .collect()
                .await;

        let outcome = BatchOutcome::from_results(results);
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "universe comparison built"
        );
        outcome
    }

    /// Rank the universe by weighted fundamental score. `None` uses the
    /// configured default weights.
    ///
    /// # Errors
    /// `InvalidInput` when any weight is negative, non-finite or above 1.
    pub async fn screener(
        &self,
        weights: Option<ScreenerWeights>,
    ) -> AnalyticsResult<BatchOutcome<ScreenerEntry>> {
        let weights = weights.unwrap_or(self.default_weights);
        // Reject bad weights before any provider call is made.
        weights.validate()?;

        let BatchOutcome { succeeded, failed } = self.comparison().await;
        let entries = succeeded.into_iter().map(|row| row.metrics).collect();

        Ok(BatchOutcome {
            succeeded: score_universe(entries, &weights)?,
            failed,
        })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fundamentals::RawFundamentals;
    use crate::market_data::UniverseEntry;
    use crate::risk::NEUTRAL_BETA;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory provider: fixed close paths ending today and canned
    /// fundamentals. Symbols without data fail as the real provider would.
    #[derive(Default)]
    pub(crate) struct MemoryProvider {
        pub closes: HashMap<String, Vec<f64>>,
        pub fundamentals: HashMap<String, RawFundamentals>,
    }

    impl MemoryProvider {
        pub fn with_closes(mut self, symbol: &str, closes: Vec<f64>) -> Self {
            self.closes.insert(symbol.to_string(), closes);
            self
        }

        pub fn with_fundamentals(mut self, symbol: &str, raw: RawFundamentals) -> Self {
            self.fundamentals.insert(symbol.to_string(), raw);
            self
        }
    }

    impl MarketDataProvider for MemoryProvider {
        async fn price_history(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> AnalyticsResult<PriceSeries> {
            let closes = self
                .closes
                .get(symbol)
                .ok_or_else(|| AnalyticsError::upstream(format!("no data for {symbol}")))?;
            let last = today();
            let points: Vec<PricePoint> = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let back = (closes.len() - 1 - i) as u64;
                    PricePoint::flat(last - chrono::Days::new(back), c, 1000)
                })
                .filter(|p| p.date >= start && p.date <= end)
                .collect();
            if points.is_empty() {
                return Err(AnalyticsError::upstream(format!(
                    "No data found for {symbol} in the specified date range"
                )));
            }
            PriceSeries::new(points)
        }

        async fn fundamentals(&self, symbol: &str) -> AnalyticsResult<RawFundamentals> {
            self.fundamentals
                .get(symbol)
                .copied()
                .ok_or_else(|| AnalyticsError::upstream(format!("no fundamentals for {symbol}")))
        }
    }

    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            universe: vec![
                UniverseEntry::new("2222.SR", "Saudi Aramco"),
                UniverseEntry::new("1180.SR", "Al Rajhi Bank"),
                UniverseEntry::new("2010.SR", "No Data Co"),
            ],
            fetch_concurrency: 2,
            ..AppConfig::default()
        }
    }

    fn wave(n: usize, base: f64, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| base + amp * ((i as f64) * 0.7).sin() + i as f64 * 0.01)
            .collect()
    }

    pub(crate) fn provider() -> MemoryProvider {
        MemoryProvider::default()
            .with_closes("2222.SR", wave(120, 30.0, 1.5))
            .with_closes("1180.SR", vec![100.0; 60])
            .with_closes("^TASI.SR", wave(120, 11_000.0, 80.0))
            .with_fundamentals(
                "2222.SR",
                RawFundamentals {
                    trailing_pe: Some(16.0),
                    return_on_equity: Some(0.24),
                    return_on_assets: Some(0.15),
                    dividend_yield: Some(0.06),
                    payout_ratio: Some(0.95),
                },
            )
            .with_fundamentals(
                "1180.SR",
                RawFundamentals {
                    trailing_pe: Some(19.0),
                    return_on_equity: Some(0.18),
                    ..Default::default()
                },
            )
    }

    fn service() -> AnalyticsService<MemoryProvider> {
        AnalyticsService::new(provider(), &test_config())
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected_before_fetching() {
        let svc = service();
        let err = svc.technical("AAPL", Period::SixMonths).await.unwrap_err();
        assert_eq!(err, AnalyticsError::UnknownSymbol("AAPL".into()));
        assert!(matches!(
            svc.financial_metrics("AAPL").await,
            Err(AnalyticsError::UnknownSymbol(_))
        ));
    }

    #[tokio::test]
    async fn history_respects_period_window() {
        let svc = service();
        let h = svc.history("2222.SR", Period::OneMonth, None, None).await.unwrap();
        assert_eq!(h.company_name, "Saudi Aramco");
        // 30 days back through today inclusive.
        assert_eq!(h.data.len(), 31);
        assert_eq!(h.data.last().unwrap().date, today());
    }

    #[tokio::test]
    async fn technical_on_constant_history() {
        let svc = service();
        let t = svc.technical("1180.SR", Period::SixMonths).await.unwrap();
        assert_eq!(t.symbol, "1180.SR");
        assert_eq!(t.metrics.sma_20, Some(100.0));
        assert_eq!(t.metrics.sma_50, Some(100.0));
        assert!(t.metrics.sma_200.is_none());
    }

    #[tokio::test]
    async fn risk_uses_benchmark_when_available() {
        let svc = service();
        let r = svc.risk("2222.SR", Period::SixMonths).await.unwrap();
        assert!(r.metrics.volatility > 0.0);
        assert!(r.metrics.max_drawdown <= 0.0);
        assert_ne!(r.metrics.beta, NEUTRAL_BETA);
    }

    #[tokio::test]
    async fn risk_degrades_to_neutral_beta_without_benchmark() {
        let mut cfg = test_config();
        cfg.benchmark_symbol = "^MISSING".into();
        let svc = AnalyticsService::new(provider(), &cfg);
        let r = svc.risk("2222.SR", Period::SixMonths).await.unwrap();
        assert_eq!(r.metrics.beta, NEUTRAL_BETA);
    }

    #[tokio::test]
    async fn relative_requires_benchmark() {
        let mut cfg = test_config();
        cfg.benchmark_symbol = "^MISSING".into();
        let svc = AnalyticsService::new(provider(), &cfg);
        assert!(matches!(
            svc.relative("2222.SR", Period::SixMonths).await,
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));

        let svc = service();
        let rel = svc.relative("2222.SR", Period::SixMonths).await.unwrap();
        assert!(rel.metrics.tracking_error > 0.0);
        assert!(rel.metrics.info_ratio.is_some());
    }

    #[tokio::test]
    async fn single_symbol_failure_propagates() {
        let svc = service();
        assert!(matches!(
            svc.risk("2010.SR", Period::OneYear).await,
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn financial_metrics_include_company_name() {
        let svc = service();
        let m = svc.financial_metrics("2222.SR").await.unwrap();
        assert_eq!(m.company_name, "Saudi Aramco");
        assert_eq!(m.metrics.symbol, "2222.SR");
        assert!((m.metrics.roe.unwrap() - 24.0).abs() < 1e-9);
        // 6 % yield capped at 60, penalised for a 95 % payout.
        assert!((m.metrics.dividend_score.unwrap() - 48.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn comparison_skips_and_reports_failures_in_order() {
        let svc = service();
        let out = svc.comparison().await;
        let symbols: Vec<&str> = out
            .succeeded
            .iter()
            .map(|r| r.metrics.symbol.as_str())
            .collect();
        assert_eq!(symbols, ["2222.SR", "1180.SR"]);
        assert_eq!(out.succeeded[1].company, "Al Rajhi Bank");
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].symbol, "2010.SR");
    }

    #[tokio::test]
    async fn screener_ranks_and_validates_weights() {
        let svc = service();
        let out = svc.screener(None).await.unwrap();
        assert_eq!(out.succeeded.len(), 2);
        assert_eq!(out.failed.len(), 1);
        assert!(out.succeeded[0].weighted_score >= out.succeeded[1].weighted_score);

        let bad = ScreenerWeights {
            roe: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            svc.screener(Some(bad)).await,
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    /// Wraps `MemoryProvider`, holding each fundamentals call back for a
    /// per-symbol delay and recording the order in which calls finish.
    struct DelayedProvider {
        inner: MemoryProvider,
        delays: HashMap<String, Duration>,
        finished: Mutex<Vec<String>>,
    }

    impl MarketDataProvider for DelayedProvider {
        async fn price_history(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> AnalyticsResult<PriceSeries> {
            self.inner.price_history(symbol, start, end).await
        }

        async fn fundamentals(&self, symbol: &str) -> AnalyticsResult<RawFundamentals> {
            if let Some(delay) = self.delays.get(symbol) {
                tokio::time::sleep(*delay).await;
            }
            let result = self.inner.fundamentals(symbol).await;
            self.finished.lock().unwrap().push(symbol.to_string());
            result
        }
    }

    /// Earlier universe symbols answer later; the two successes tie on every
    /// fundamental.
    fn reversed_completion_service() -> AnalyticsService<DelayedProvider> {
        let same = RawFundamentals {
            trailing_pe: Some(12.0),
            return_on_equity: Some(0.2),
            return_on_assets: Some(0.08),
            dividend_yield: Some(0.04),
            payout_ratio: Some(0.5),
        };
        let inner = MemoryProvider::default()
            .with_fundamentals("2222.SR", same)
            .with_fundamentals("1180.SR", same);
        let delays = HashMap::from([
            ("2222.SR".to_string(), Duration::from_millis(80)),
            ("1180.SR".to_string(), Duration::from_millis(40)),
        ]);
        let mut cfg = test_config();
        cfg.fetch_concurrency = 3;
        AnalyticsService::new(
            DelayedProvider {
                inner,
                delays,
                finished: Mutex::new(Vec::new()),
            },
            &cfg,
        )
    }

    #[tokio::test]
    async fn comparison_keeps_universe_order_when_calls_finish_reversed() {
        let svc = reversed_completion_service();
        let out = svc.comparison().await;

        assert_eq!(
            *svc.provider.finished.lock().unwrap(),
            ["2010.SR", "1180.SR", "2222.SR"]
        );
        let symbols: Vec<&str> = out
            .succeeded
            .iter()
            .map(|r| r.metrics.symbol.as_str())
            .collect();
        assert_eq!(symbols, ["2222.SR", "1180.SR"]);
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].symbol, "2010.SR");
    }

    #[tokio::test]
    async fn screener_ties_keep_universe_order_when_calls_finish_reversed() {
        let svc = reversed_completion_service();
        let out = svc.screener(None).await.unwrap();

        assert_eq!(out.succeeded.len(), 2);
        assert_eq!(
            out.succeeded[0].weighted_score,
            out.succeeded[1].weighted_score
        );
        assert_eq!(out.succeeded[0].fundamentals.symbol, "2222.SR");
        assert_eq!(out.succeeded[1].fundamentals.symbol, "1180.SR");
    }

    #[test]
    fn batch_outcome_splits_results() {
        let out = BatchOutcome::from_results(vec![
            ("A".to_string(), Ok(1)),
            ("B".to_string(), Err(AnalyticsError::upstream("down"))),
            ("C".to_string(), Ok(3)),
        ]);
        assert_eq!(out.succeeded, vec![1, 3]);
        assert_eq!(out.failed[0].symbol, "B");
        assert!(out.failed[0].reason.contains("down"));
    }
}
