// =============================================================================
// Market-data provider seam
// =============================================================================
//
// The analytics service only ever talks to this trait. Production wires in
// the Yahoo Finance client; tests use an in-memory implementation.

use std::future::Future;

use chrono::NaiveDate;

use crate::error::AnalyticsResult;
use crate::fundamentals::RawFundamentals;
use crate::types::PriceSeries;

pub trait MarketDataProvider: Send + Sync + 'static {
    /// Daily prices for `symbol` between `start` and `end`, both inclusive.
    ///
    /// Fails with `UpstreamUnavailable` when the provider has no rows for the
    /// range.
    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = AnalyticsResult<PriceSeries>> + Send;

    /// Latest reported fundamentals for `symbol`. Individual fields may be
    /// absent.
    fn fundamentals(
        &self,
        symbol: &str,
    ) -> impl Future<Output = AnalyticsResult<RawFundamentals>> + Send;
}
