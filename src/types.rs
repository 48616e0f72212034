// =============================================================================
// Shared value types used across the analytics engine
// =============================================================================
//
// All of these are request-scoped values. Nothing here is cached or shared
// between calls.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

// ---------------------------------------------------------------------------
// Price data
// ---------------------------------------------------------------------------

/// One daily OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A point whose OHLC are all equal to `close`.
    pub fn flat(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self::new(date, close, close, close, close, volume)
    }
}

/// A non-empty daily price series with strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting empty input and out-of-order or duplicate
    /// dates.
    pub fn new(points: Vec<PricePoint>) -> AnalyticsResult<Self> {
        if points.is_empty() {
            return Err(AnalyticsError::insufficient(
                "price series must contain at least one point",
            ));
        }
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AnalyticsError::invalid(format!(
                "price series dates must be strictly increasing ({} followed by {})",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    pub fn into_points(self) -> Vec<PricePoint> {
        self.points
    }
}

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

/// A simple daily return, dated by the later of the two closes it spans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered daily returns derived from a [`PriceSeries`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    /// Build a return series supplied by a caller. Dates must be strictly
    /// increasing and every value finite.
    pub fn new(points: Vec<ReturnPoint>) -> AnalyticsResult<Self> {
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AnalyticsError::invalid(format!(
                "return series dates must be strictly increasing ({} followed by {})",
                w[0].date, w[1].date
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(AnalyticsError::invalid(format!(
                "non-finite return on {}",
                p.date
            )));
        }
        Ok(Self { points })
    }

    pub(crate) fn from_points(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
