// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the trend and momentum indicators
// reported by the technical snapshot. Series functions make a single
// left-to-right pass; scalar accessors return `Option<f64>` so callers must
// handle insufficient history instead of reading a zero.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{calculate_bollinger, BollingerResult};
pub use ema::{calculate_ema, current_ema};
pub use macd::{calculate_macd, MacdResult};
pub use rsi::current_rsi;
pub use sma::{calculate_sma, current_sma};
