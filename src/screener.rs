// =============================================================================
// Screener Scoring Engine — weighted multi-factor ranking of the universe
// =============================================================================
//
// Weights are normalised to sum to 1 (a zero total leaves every weight at 0).
// Each factor contributes only when both its value and its weight are present
// and non-zero:
//
//   P/E             (1 / pe) * w * 20        only for 0 < pe < 100
//   ROE             min(roe_pct / 30, 1) * w
//   ROA             min(roa_pct / 12, 1) * w
//   Dividend yield  min(yield_pct / 7, 1) * w
//
//   score = sum(contributions) / factors_used * 100,  0 when nothing was used
//
// The P/E term is not capped like the other three, so a very low P/E can push
// the score past 100. Such entries are flagged with `outside_nominal_range`
// and keep their unclamped score. A P/E so close to zero that its term
// overflows is not counted, and the score saturates at `f64::MAX`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::fundamentals::FundamentalSnapshot;

const PE_UPPER_BOUND: f64 = 100.0;
const PE_SCALE: f64 = 20.0;
const ROE_FULL_MARKS_PCT: f64 = 30.0;
const ROA_FULL_MARKS_PCT: f64 = 12.0;
const YIELD_FULL_MARKS_PCT: f64 = 7.0;

fn default_weight() -> f64 {
    0.25
}

/// Relative importance of each screener factor. Omitted fields take the
/// default weight of 0.25.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenerWeights {
    #[serde(default = "default_weight")]
    pub pe_ratio: f64,
    #[serde(default = "default_weight")]
    pub roe: f64,
    #[serde(default = "default_weight")]
    pub roa: f64,
    #[serde(default = "default_weight")]
    pub dividend_yield: f64,
}

impl Default for ScreenerWeights {
    fn default() -> Self {
        Self {
            pe_ratio: default_weight(),
            roe: default_weight(),
            roa: default_weight(),
            dividend_yield: default_weight(),
        }
    }
}

impl ScreenerWeights {
    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("pe_ratio", self.pe_ratio),
            ("roe", self.roe),
            ("roa", self.roa),
            ("dividend_yield", self.dividend_yield),
        ]
    }

    /// Every weight must be finite and within `[0, 1]`.
    pub fn validate(&self) -> AnalyticsResult<()> {
        for (name, w) in self.fields() {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(AnalyticsError::invalid(format!(
                    "weight '{name}' must be between 0 and 1, got {w}"
                )));
            }
        }
        Ok(())
    }

    /// Weights rescaled to sum to 1. A zero total is returned unchanged.
    pub fn normalized(&self) -> Self {
        let total: f64 = self.fields().iter().map(|(_, w)| w).sum();
        if total == 0.0 {
            return *self;
        }
        Self {
            pe_ratio: self.pe_ratio / total,
            roe: self.roe / total,
            roa: self.roa / total,
            dividend_yield: self.dividend_yield / total,
        }
    }
}

/// One ranked row of the screener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerEntry {
    #[serde(flatten)]
    pub fundamentals: FundamentalSnapshot,
    pub weighted_score: f64,
    /// Number of factors that contributed to the score.
    pub factors_used: u8,
    /// Set when the score falls outside `[0, 100]`.
    pub outside_nominal_range: bool,
}

/// Score every entry and rank by `weighted_score`, highest first. Entries
/// with equal scores keep their input order. No entry is dropped.
///
/// # Errors
/// `InvalidInput` when `weights` fails [`ScreenerWeights::validate`].
pub fn score_universe(
    entries: Vec<FundamentalSnapshot>,
    weights: &ScreenerWeights,
) -> AnalyticsResult<Vec<ScreenerEntry>> {
    weights.validate()?;
    let weights = weights.normalized();

    let mut ranked: Vec<ScreenerEntry> = entries
        .into_iter()
        .map(|fundamentals| score_entry(fundamentals, &weights))
        .collect();

    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
    Ok(ranked)
}

fn score_entry(fundamentals: FundamentalSnapshot, w: &ScreenerWeights) -> ScreenerEntry {
    let contributions = [
        usable(fundamentals.pe_ratio, w.pe_ratio)
            .filter(|(pe, _)| *pe > 0.0 && *pe < PE_UPPER_BOUND)
            .map(|(pe, w)| (1.0 / pe) * w * PE_SCALE)
            .filter(|c| c.is_finite()),
        usable(fundamentals.roe, w.roe).map(|(v, w)| capped(v, ROE_FULL_MARKS_PCT) * w),
        usable(fundamentals.roa, w.roa).map(|(v, w)| capped(v, ROA_FULL_MARKS_PCT) * w),
        usable(fundamentals.dividend_yield, w.dividend_yield)
            .map(|(v, w)| capped(v, YIELD_FULL_MARKS_PCT) * w),
    ];

    let (sum, used) = contributions
        .iter()
        .flatten()
        .fold((0.0, 0u8), |(s, n), c| (s + c, n + 1));

    let weighted_score = if used > 0 {
        (sum / used as f64 * 100.0).min(f64::MAX)
    } else {
        0.0
    };

    ScreenerEntry {
        fundamentals,
        weighted_score,
        factors_used: used,
        outside_nominal_range: !(0.0..=100.0).contains(&weighted_score),
    }
}

/// The `(value, weight)` pair when both are present and non-zero.
fn usable(value: Option<f64>, weight: f64) -> Option<(f64, f64)> {
    value
        .filter(|v| *v != 0.0 && v.is_finite())
        .filter(|_| weight != 0.0)
        .map(|v| (v, weight))
}

fn capped(value: f64, full_marks: f64) -> f64 {
    (value / full_marks).min(1.0)
}
