// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the *sample* standard deviation of
// the same closes the SMA averages (n - 1 denominator).

use super::sma::current_sma;

/// Result of a Bollinger Band calculation at the last close.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands for the given closing prices.
///
/// Returns `Some(BollingerResult)` containing:
/// - `upper`  = SMA + `num_std` * σ
/// - `middle` = SMA
/// - `lower`  = SMA - `num_std` * σ
///
/// Returns `None` when:
/// - `period < 2` (no sample deviation).
/// - Fewer than `period` data points.
/// - Any band is non-finite.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let middle = current_sma(closes, period)?;
    let window = &closes[closes.len() - period..];

    let variance =
        window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / (period - 1) as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;

    if upper.is_finite() && lower.is_finite() {
        Some(BollingerResult {
            upper,
            middle,
            lower,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert!((bb.middle - 10.5).abs() < 1e-10);
        // Sample std of 1..=20 = sqrt(35).
        let sigma = 35.0_f64.sqrt();
        assert!((bb.upper - (10.5 + 2.0 * sigma)).abs() < 1e-9);
        assert!((bb.lower - (10.5 - 2.0 * sigma)).abs() < 1e-9);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let closes = vec![1.0, 2.0, 3.0];
        assert!(calculate_bollinger(&closes, 20, 2.0).is_none());
        assert!(calculate_bollinger(&vec![5.0; 19], 20, 2.0).is_none());
    }

    #[test]
    fn bollinger_flat() {
        let closes = vec![100.0; 20];
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(bb.upper, 100.0);
        assert_eq!(bb.lower, 100.0);
        assert_eq!(bb.middle, 100.0);
    }

    #[test]
    fn bollinger_uses_trailing_window() {
        let mut closes: Vec<f64> = (1..=30).map(|x| x as f64 * 7.0).collect();
        closes.extend(vec![50.0; 20]);
        let bb = calculate_bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(bb.upper, 50.0);
        assert_eq!(bb.lower, 50.0);
    }
}
