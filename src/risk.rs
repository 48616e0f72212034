// =============================================================================
// Risk Metrics Calculator — volatility, beta, Sharpe ratio, max drawdown
// =============================================================================
//
//   volatility   = sample σ(daily returns) * sqrt(trading_days)
//   beta         = cov(r, r_bench) / var(r_bench)   over matched dates
//   sharpe       = (mean(r) - rf / trading_days) / σ(r) * sqrt(trading_days)
//   max drawdown = min_t( W_t / max_{s<=t} W_s ) - 1,  W_t = Π(1 + r)
//
// Beta degrades instead of failing: with no benchmark, no overlapping dates,
// too few overlaps, or a benchmark without variance, beta is the neutral 1.0.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::series::{align_returns, AlignedReturns};
use crate::stats::{
    checked_ratio, mean, require_finite, sample_covariance, sample_std, sample_variance,
};
use crate::types::ReturnSeries;

/// Beta reported when it cannot be estimated against the benchmark.
pub const NEUTRAL_BETA: f64 = 1.0;

/// Annualisation and risk-free conventions shared with the relative
/// performance calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Annual risk-free rate as a fraction (0.02 = 2 %).
    pub risk_free_annual: f64,
    /// Trading days per year used for annualisation.
    pub trading_days: u32,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            risk_free_annual: 0.02,
            trading_days: 252,
        }
    }
}

impl RiskParams {
    pub fn risk_free_daily(&self) -> f64 {
        self.risk_free_annual / self.trading_days as f64
    }

    pub fn annualization(&self) -> f64 {
        (self.trading_days as f64).sqrt()
    }
}

/// Risk statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub beta: f64,
    /// Annualised volatility as a fraction.
    pub volatility: f64,
    /// Absent when daily returns have no dispersion.
    pub sharpe_ratio: Option<f64>,
    /// Peak-to-trough decline as a non-positive fraction.
    pub max_drawdown: f64,
}

/// Compute the risk snapshot with the default 2 % / 252-day conventions.
pub fn compute_risk(
    returns: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
) -> AnalyticsResult<RiskSnapshot> {
    compute_risk_with(returns, benchmark, &RiskParams::default())
}

/// Compute the risk snapshot under explicit conventions.
///
/// # Errors
/// `InsufficientData` when `returns` is empty. `InvalidInput` when the
/// returns are too extreme for annualised volatility to stay finite.
pub fn compute_risk_with(
    returns: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
    params: &RiskParams,
) -> AnalyticsResult<RiskSnapshot> {
    if returns.is_empty() {
        return Err(AnalyticsError::insufficient(
            "risk metrics need at least one daily return",
        ));
    }

    let values = returns.values();
    let std = sample_std(&values);

    // A single return has no sample dispersion; it is reported as zero
    // volatility rather than an undefined value.
    let volatility = require_finite(std.unwrap_or(0.0) * params.annualization(), "volatility")?;

    let sharpe_ratio = match (mean(&values), std) {
        (Some(m), Some(s)) => checked_ratio(m - params.risk_free_daily(), s, "sharpe_ratio")
            .ok()
            .map(|r| r * params.annualization())
            .filter(|r| r.is_finite()),
        _ => None,
    };

    let beta = match benchmark {
        Some(bench) => beta_or_neutral(&align_returns(returns, bench)),
        None => {
            debug!("no benchmark supplied — using neutral beta");
            NEUTRAL_BETA
        }
    };

    Ok(RiskSnapshot {
        beta,
        volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(&values),
    })
}

/// Beta of the subject against the benchmark over already-matched dates, or
/// [`NEUTRAL_BETA`] when it cannot be estimated.
pub fn beta_or_neutral(aligned: &AlignedReturns) -> f64 {
    match estimate_beta(aligned) {
        Ok(beta) => beta,
        Err(e) => {
            warn!(
                matched_days = aligned.len(),
                error = %e,
                "beta not estimable — falling back to neutral beta"
            );
            NEUTRAL_BETA
        }
    }
}

fn estimate_beta(aligned: &AlignedReturns) -> AnalyticsResult<f64> {
    if aligned.len() < 2 {
        return Err(AnalyticsError::insufficient(format!(
            "beta needs at least 2 matched returns, got {}",
            aligned.len()
        )));
    }
    let covariance = sample_covariance(&aligned.subject, &aligned.benchmark)
        .ok_or_else(|| AnalyticsError::insufficient("covariance undefined"))?;
    let variance = sample_variance(&aligned.benchmark)
        .ok_or_else(|| AnalyticsError::insufficient("benchmark variance undefined"))?;
    checked_ratio(covariance, variance, "beta")
}

/// Largest peak-to-trough decline of the compounded return path, as a
/// non-positive fraction. An empty slice has no drawdown.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut wealth = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns {
        wealth *= 1.0 + r;
        if wealth > peak {
            peak = wealth;
        }
        let drawdown = wealth / peak - 1.0;
        if drawdown < worst {
            worst = drawdown;
        }
    }

    worst
}
