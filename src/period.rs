// =============================================================================
// Look-back period tokens shared by every time-windowed endpoint
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Trailing calendar window ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "2Y")]
    TwoYears,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    /// Calendar days covered by the window.
    pub fn days(self) -> u64 {
        match self {
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::SixMonths => 180,
            Period::OneYear => 365,
            Period::TwoYears => 730,
            Period::FiveYears => 1825,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::SixMonths => "6M",
            Period::OneYear => "1Y",
            Period::TwoYears => "2Y",
            Period::FiveYears => "5Y",
        }
    }

    /// `(start, end)` of the window that ends on `today`.
    pub fn window_ending(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today
            .checked_sub_days(Days::new(self.days()))
            .unwrap_or(NaiveDate::MIN);
        (start, today)
    }
}

/// Resolve the date window of a request: explicit `start`/`end` win when both
/// are given, otherwise the trailing `period` ending on `today`.
pub fn resolve_window(
    period: Period,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> AnalyticsResult<(NaiveDate, NaiveDate)> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(AnalyticsError::invalid(format!(
            "start_date {start} is after end_date {end}"
        ))),
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Ok(period.window_ending(today)),
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AnalyticsError::invalid(format!("Invalid period: {s}")))
    }
}
