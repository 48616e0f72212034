// =============================================================================
// Technical Indicator Calculator
// =============================================================================
//
// Evaluates every indicator of the technical snapshot against the closing
// prices of one series and reports the value at the series' last date. A
// field is `None` when its window needs more history than the series has.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::indicators::{calculate_bollinger, calculate_macd, current_ema, current_rsi, current_sma};
use crate::indicators::macd::{FAST_PERIOD, SIGNAL_PERIOD, SLOW_PERIOD};
use crate::types::PriceSeries;

const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD: f64 = 2.0;

/// Latest technical indicator values for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

/// Compute the technical snapshot for `series`.
pub fn compute_technical(series: &PriceSeries) -> TechnicalSnapshot {
    let closes = series.closes();
    let macd = calculate_macd(&closes, FAST_PERIOD, SLOW_PERIOD, SIGNAL_PERIOD);
    let bands = calculate_bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_STD);

    let snapshot = TechnicalSnapshot {
        sma_20: current_sma(&closes, 20),
        sma_50: current_sma(&closes, 50),
        sma_200: current_sma(&closes, 200),
        ema_20: current_ema(&closes, 20),
        rsi_14: current_rsi(&closes, RSI_PERIOD),
        macd: macd.map(|m| m.macd),
        macd_signal: macd.map(|m| m.signal),
        bollinger_upper: bands.as_ref().map(|b| b.upper),
        bollinger_lower: bands.as_ref().map(|b| b.lower),
    };

    trace!(
        points = closes.len(),
        last_date = %series.last_date(),
        sma_200 = ?snapshot.sma_200,
        rsi_14 = ?snapshot.rsi_14,
        "technical snapshot computed"
    );

    snapshot
}
