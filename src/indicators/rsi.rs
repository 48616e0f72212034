// =============================================================================
// Relative Strength Index (RSI) — Simple rolling averages
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split each delta into a gain (positive part) and a loss (magnitude
//          of the negative part); the opposite side is zero for that day.
// Step 3 — avg_gain / avg_loss = arithmetic mean over the last `period` deltas.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Saturation rule when avg_loss == 0:
//   avg_gain > 0  => RS is +inf, so RSI takes its limit 100.0. The infinite RS
//                    is never materialised.
//   avg_gain == 0 => 0/0, RSI is undefined and reported as absent.
// =============================================================================

/// Compute the RSI at the last close using the trailing `period` deltas.
///
/// Returns `None` when:
/// - `period == 0`
/// - Fewer than `period` deltas exist (`closes.len() < period + 1`)
/// - The window has neither gains nor losses (flat prices)
/// - The result is non-finite
pub fn current_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (sum_gain, sum_loss) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });

    let period_f = period as f64;
    rsi_from_averages(sum_gain / period_f, sum_loss / period_f)
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(current_rsi(&[], 14).is_none());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(current_rsi(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(current_rsi(&closes, 14).is_none());
    }

    #[test]
    fn rsi_all_gains_saturates_at_100() {
        for n in 15..40 {
            let closes: Vec<f64> = (1..=n).map(|x| x as f64).collect();
            let v = current_rsi(&closes, 14).unwrap();
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let v = current_rsi(&closes, 14).unwrap();
        assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
    }

    #[test]
    fn rsi_flat_market_is_absent() {
        let closes = vec![100.0; 30];
        assert!(current_rsi(&closes, 14).is_none());
    }

    #[test]
    fn rsi_uses_only_trailing_window() {
        // Early losses fall out of the 14-delta window; the tail is all gains.
        let mut closes: Vec<f64> = (1..=20).rev().map(|x| x as f64).collect();
        closes.extend((2..=16).map(|x| x as f64));
        let v = current_rsi(&closes, 14).unwrap();
        assert!((v - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_known_value() {
        // 7 gains of 2 and 7 losses of 1 => RS = 2 => RSI = 66.666...
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let v = current_rsi(&closes, 14).unwrap();
        assert!((v - 200.0 / 3.0).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let v = current_rsi(&closes, 14).unwrap();
        assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
    }
}
