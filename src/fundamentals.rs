// =============================================================================
// Fundamental Metrics Normalizer
// =============================================================================
//
// Providers report return-on-equity, return-on-assets, dividend yield and
// payout ratio as fractions; the snapshot presents them as percentages.
// Missing upstream values stay absent and are never coerced to zero.
//
// Dividend score (house heuristic, not a market-standard measure):
//
//   base  = min(100, dividend_yield_pct * 10)
//   score = base * 0.8   if payout_ratio_pct > 80
//         = base         otherwise
//
// The score is absent unless both the yield and the payout ratio are known.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Payout ratios above this percentage are considered unsustainable.
const PAYOUT_PENALTY_THRESHOLD_PCT: f64 = 80.0;
const PAYOUT_PENALTY_FACTOR: f64 = 0.8;
const DIVIDEND_SCORE_CAP: f64 = 100.0;

/// Fundamentals as the provider reports them (fractions, not percentages).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFundamentals {
    pub trailing_pe: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
}

/// Presentation-ready fundamentals for one symbol, percentages where noted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub symbol: String,
    pub pe_ratio: Option<f64>,
    /// Return on equity, %.
    pub roe: Option<f64>,
    /// Return on assets, %.
    pub roa: Option<f64>,
    /// %.
    pub dividend_yield: Option<f64>,
    /// %.
    pub payout_ratio: Option<f64>,
    pub dividend_score: Option<f64>,
}

/// One row of the universe comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub company: String,
    #[serde(flatten)]
    pub metrics: FundamentalSnapshot,
}

/// Scale the provider's fractions to percentages and derive the dividend
/// score. A P/E that is not strictly positive (loss-making company) is
/// reported as absent.
pub fn normalize_fundamentals(symbol: &str, raw: &RawFundamentals) -> FundamentalSnapshot {
    let pe_ratio = finite(raw.trailing_pe).filter(|pe| *pe > 0.0);
    let dividend_yield = as_percent(raw.dividend_yield);
    let payout_ratio = as_percent(raw.payout_ratio);

    FundamentalSnapshot {
        symbol: symbol.to_string(),
        pe_ratio,
        roe: as_percent(raw.return_on_equity),
        roa: as_percent(raw.return_on_assets),
        dividend_yield,
        payout_ratio,
        dividend_score: dividend_score(dividend_yield, payout_ratio),
    }
}

/// Dividend score from percentage yield and payout ratio.
pub fn dividend_score(yield_pct: Option<f64>, payout_pct: Option<f64>) -> Option<f64> {
    let (yield_pct, payout_pct) = (yield_pct?, payout_pct?);
    let base = (yield_pct * 10.0).min(DIVIDEND_SCORE_CAP);
    if payout_pct > PAYOUT_PENALTY_THRESHOLD_PCT {
        Some(base * PAYOUT_PENALTY_FACTOR)
    } else {
        Some(base)
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn as_percent(fraction: Option<f64>) -> Option<f64> {
    finite(fraction).map(|f| f * 100.0)
}
