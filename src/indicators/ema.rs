// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha = 2 / (period + 1)
//   EMA_0 = close_0
//   EMA_t = close_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The recursion is seeded with the first close (no SMA warm-up), so the output
// has exactly one value per input and is defined from the very first point.
// =============================================================================

/// Compute the EMA series for `values` and look-back `period`.
///
/// Returns an empty `Vec` when the input is empty or the period is zero.
/// Each output element corresponds to the input element at the same index.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - Non-finite intermediate values stop the series; downstream consumers
///   should not trust anything past a broken point.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    if !prev.is_finite() {
        return Vec::new();
    }
    result.push(prev);

    for &value in &values[1..] {
        let ema = value * alpha + prev * (1.0 - alpha);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}

/// EMA at the last value, or `None` when the series could not be computed to
/// the end.
pub fn current_ema(values: &[f64], period: usize) -> Option<f64> {
    let series = calculate_ema(values, period);
    if series.len() != values.len() {
        return None;
    }
    series.last().copied()
}
