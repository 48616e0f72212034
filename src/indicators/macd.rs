// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD   = EMA(fast) - EMA(slow)
//   Signal = EMA(signal) of the MACD series itself
//
// Both EMAs are seeded with the first close, so the MACD line has one value
// per close and the signal line is defined wherever MACD is.

use super::ema::calculate_ema;

/// Standard parameterisation: 12 / 26 / 9.
pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// Latest MACD line and signal line values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
}

/// Compute MACD(fast, slow, signal) at the last close.
///
/// Returns `None` for empty input, zero periods, or when a non-finite value
/// truncates any of the underlying EMA series.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Option<MacdResult> {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    if closes.is_empty() || fast_ema.len() != closes.len() || slow_ema.len() != closes.len() {
        return None;
    }

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = calculate_ema(&macd_line, signal);
    if signal_line.len() != macd_line.len() {
        return None;
    }

    Some(MacdResult {
        macd: *macd_line.last()?,
        signal: *signal_line.last()?,
    })
}
