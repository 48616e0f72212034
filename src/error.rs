// =============================================================================
// Analytics Error Taxonomy
// =============================================================================
//
// Every engine and service operation returns `Result<T, AnalyticsError>`.
// Undefined ratios that need not fail a whole response (Sharpe with zero
// dispersion, information ratio with zero tracking error, RSI without losses
// and gains) are surfaced as `None` fields instead of errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// The series is too short for the requested statistic.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Non-positive price, unknown period token, malformed weights, unordered
    /// series, and similar caller mistakes.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The market-data collaborator failed or returned nothing.
    #[error("upstream data unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A ratio whose denominator is zero, where the ratio is mandatory.
    #[error("division by zero in '{0}'")]
    DivisionByZero(String),

    /// The symbol is not part of the configured universe.
    #[error("stock with symbol {0} not found")]
    UnknownSymbol(String),
}

impl AnalyticsError {
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
