// =============================================================================
// Relative Performance Calculator — annual return, alpha, tracking error, IR
// =============================================================================
//
// All benchmark-relative statistics are taken over the dates both series
// share. The reported `annual_return` is the subject's own compounded mean over
// its full history; alpha and the information ratio use the annualised returns
// of the matched window on both sides.
//
//   ann(r)   = (1 + mean(r))^252 - 1
//   alpha    = ann(s) - (rf + beta * (ann(b) - rf))
//   TE       = sample σ(s - b) * sqrt(252)
//   IR       = (ann(s) - ann(b)) / TE
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::risk::{beta_or_neutral, RiskParams};
use crate::series::align_returns;
use crate::stats::{annualize_mean_return, checked_ratio, mean, require_finite, sample_std};
use crate::types::ReturnSeries;

/// Benchmark-relative statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativePerformanceSnapshot {
    pub annual_return: f64,
    pub alpha: f64,
    /// Absent when the tracking error is zero.
    pub info_ratio: Option<f64>,
    pub tracking_error: f64,
}

pub fn compute_relative(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
) -> AnalyticsResult<RelativePerformanceSnapshot> {
    compute_relative_with(returns, benchmark, &RiskParams::default())
}

/// # Errors
/// `InsufficientData` when the subject and benchmark share no dates.
/// `InvalidInput` when compounding a return overflows to a non-finite value.
pub fn compute_relative_with(
    returns: &ReturnSeries,
    benchmark: &ReturnSeries,
    params: &RiskParams,
) -> AnalyticsResult<RelativePerformanceSnapshot> {
    let aligned = align_returns(returns, benchmark);
    if aligned.is_empty() {
        return Err(AnalyticsError::insufficient(
            "subject and benchmark returns share no dates",
        ));
    }

    let days = params.trading_days;
    let rf = params.risk_free_annual;

    // Non-empty series always have a mean.
    let full_mean = mean(&returns.values()).unwrap_or(0.0);
    let subject_mean = mean(&aligned.subject).unwrap_or(0.0);
    let bench_mean = mean(&aligned.benchmark).unwrap_or(0.0);

    let annualize = |m: f64, metric: &str| require_finite(annualize_mean_return(m, days), metric);
    let annual_return = annualize(full_mean, "annual_return")?;
    let subject_ann = annualize(subject_mean, "annual_return")?;
    let bench_ann = annualize(bench_mean, "benchmark_return")?;

    let beta = beta_or_neutral(&aligned);
    let alpha = require_finite(subject_ann - (rf + beta * (bench_ann - rf)), "alpha")?;

    let active: Vec<f64> = aligned
        .subject
        .iter()
        .zip(&aligned.benchmark)
        .map(|(s, b)| s - b)
        .collect();
    let tracking_error = require_finite(
        sample_std(&active).unwrap_or(0.0) * params.annualization(),
        "tracking_error",
    )?;

    let info_ratio = checked_ratio(subject_ann - bench_ann, tracking_error, "info_ratio").ok();
    if info_ratio.is_none() {
        debug!(matched_days = aligned.len(), "zero tracking error — information ratio absent");
    }

    Ok(RelativePerformanceSnapshot {
        annual_return,
        alpha,
        info_ratio,
        tracking_error,
    })
}
