// =============================================================================
// Series Preprocessor — validated simple returns and date alignment
// =============================================================================
//
//   r[i] = close[i] / close[i-1] - 1
//
// Returns are only taken between consecutive points that are already ordered.
// Missing trading days are not filled in; a gap simply produces one return
// spanning the gap.
// =============================================================================

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{PriceSeries, ReturnPoint, ReturnSeries};

/// Derive the simple daily return series from `series`.
///
/// # Errors
/// - `InsufficientData` when the series has fewer than 2 points.
/// - `InvalidInput` when any close is non-positive or non-finite.
pub fn derive_returns(series: &PriceSeries) -> AnalyticsResult<ReturnSeries> {
    let points = series.points();
    if points.len() < 2 {
        return Err(AnalyticsError::insufficient(format!(
            "at least 2 prices are required to derive returns, got {}",
            points.len()
        )));
    }

    if let Some(bad) = points
        .iter()
        .find(|p| !(p.close.is_finite() && p.close > 0.0))
    {
        return Err(AnalyticsError::invalid(format!(
            "invalid close price {} on {}",
            bad.close, bad.date
        )));
    }

    let returns = points
        .windows(2)
        .map(|w| ReturnPoint {
            date: w[1].date,
            value: w[1].close / w[0].close - 1.0,
        })
        .collect();

    Ok(ReturnSeries::from_points(returns))
}

/// Two return series restricted to the dates they have in common.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedReturns {
    pub dates: Vec<NaiveDate>,
    pub subject: Vec<f64>,
    pub benchmark: Vec<f64>,
}

impl AlignedReturns {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Intersect `subject` and `benchmark` on date, keeping the subject's order.
pub fn align_returns(subject: &ReturnSeries, benchmark: &ReturnSeries) -> AlignedReturns {
    let bench: HashMap<NaiveDate, f64> = benchmark
        .points()
        .iter()
        .map(|p| (p.date, p.value))
        .collect();

    let mut aligned = AlignedReturns::default();
    for p in subject.points() {
        if let Some(&b) = bench.get(&p.date) {
            aligned.dates.push(p.date);
            aligned.subject.push(p.value);
            aligned.benchmark.push(b);
        }
    }
    aligned
}
