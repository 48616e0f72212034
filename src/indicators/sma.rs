// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_t = (close_{t-n+1} + ... + close_t) / n
//
// Computed with a running window sum: each step adds the newest close and
// drops the one that left the window, so the whole series costs O(len).
// =============================================================================

/// Compute the trailing SMA series for `closes` and `period`.
///
/// The output has one element per close starting at index `period - 1`, so it
/// is empty when `period == 0` or there are fewer than `period` closes.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    let mut window_sum: f64 = closes[..period].iter().sum();
    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(window_sum / n);

    for i in period..closes.len() {
        window_sum += closes[i] - closes[i - period];
        result.push(window_sum / n);
    }

    result
}

/// SMA at the last close, `None` while the window is not yet full.
pub fn current_sma(closes: &[f64], period: usize) -> Option<f64> {
    let value = *calculate_sma(closes, period).last()?;
    value.is_finite().then_some(value)
}
