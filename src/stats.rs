// =============================================================================
// Descriptive statistics shared by the risk and relative-performance modules
// =============================================================================
//
// Dispersion measures use the sample (n - 1) denominator throughout, so a
// single observation has no defined variance.

use crate::error::{AnalyticsError, AnalyticsResult};

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance, `None` with fewer than 2 observations.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation, `None` with fewer than 2 observations.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Sample covariance of two equally long slices.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let ma = mean(a)?;
    let mb = mean(b)?;
    let s = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>();
    Some(s / (a.len() - 1) as f64)
}

/// `numerator / denominator`, failing instead of producing an infinity or NaN.
pub fn checked_ratio(numerator: f64, denominator: f64, metric: &str) -> AnalyticsResult<f64> {
    if denominator == 0.0 {
        return Err(AnalyticsError::DivisionByZero(metric.to_string()));
    }
    let value = numerator / denominator;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyticsError::DivisionByZero(metric.to_string()))
    }
}

/// `value` unchanged, or `InvalidInput` when it overflowed to an infinity or
/// NaN. Compounding and annualisation can overflow on extreme but valid
/// price paths.
pub fn require_finite(value: f64, metric: &str) -> AnalyticsResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyticsError::invalid(format!(
            "{metric} is not representable for this price history"
        )))
    }
}

/// Annualise a daily mean return by compounding: `(1 + mean)^days - 1`.
pub fn annualize_mean_return(mean_daily: f64, trading_days: u32) -> f64 {
    (1.0 + mean_daily).powi(trading_days as i32) - 1.0
}
