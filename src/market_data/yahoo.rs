// =============================================================================
// Yahoo Finance REST Client — daily charts and quote-summary fundamentals
// =============================================================================
//
// Endpoints:
//   GET {base}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//   GET {base}/v10/finance/quoteSummary/{symbol}?modules=..&crumb=..
//   GET {base}/v1/test/getcrumb
//
// quoteSummary only answers for a session: a cookie set by the consent host
// plus a matching crumb. The crumb is fetched on first use, cached on the
// client and refreshed once when Yahoo rejects it with 401.
//
// Transport and HTTP failures are handled with `anyhow` internally and
// surface to callers as `AnalyticsError::UpstreamUnavailable`. Parsing is
// split into pure functions so it can be tested against captured payloads.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::fundamentals::RawFundamentals;
use crate::market_data::provider::MarketDataProvider;
use crate::types::{PricePoint, PriceSeries};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

const USER_AGENT: &str = concat!("mefic-analytics/", env!("CARGO_PKG_VERSION"));
const SUMMARY_MODULES: &str = "summaryDetail,financialData";
/// Any response from this host sets the session cookie the crumb is bound to.
const COOKIE_SEED_URL: &str = "https://fc.yahoo.com";

/// Yahoo Finance client. Cheap to clone; the connection pool, cookie jar and
/// session crumb are shared.
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    base_url: String,
    client: reqwest::Client,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooFinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;

        debug!(base_url = %base_url, "YahooFinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    /// GET a document and return it with its status. Error bodies that are
    /// not JSON are kept as a string.
    async fn fetch_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, Value)> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read response from {url}"))?;

        let body = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => Value::String(text),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to parse response from {url}"))
            }
        };
        Ok((status, body))
    }

    /// GET a JSON document, failing on transport errors and non-2xx status.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let (status, body) = self.fetch_json(url, query).await?;
        ensure_success(url, status, body)
    }

    /// The cached session crumb, establishing a session first if needed.
    /// Holding the lock while fetching keeps concurrent callers from
    /// requesting crumbs of their own.
    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // The seed host answers 404; only the cookie it sets matters.
        if let Err(e) = self.client.get(COOKIE_SEED_URL).send().await {
            debug!(error = %e, "cookie seed request failed");
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} request failed"))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("failed to read response from {url}"))?;
        if !status.is_success() {
            anyhow::bail!("Yahoo GET {} returned {}: {}", url, status, text.trim());
        }

        let crumb = parse_crumb(&text)
            .with_context(|| format!("Yahoo GET {url} returned no usable crumb"))?;
        debug!("Yahoo session crumb acquired");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn summary_request(&self, url: &str) -> Result<(StatusCode, Value)> {
        let crumb = self.crumb().await?;
        self.fetch_json(
            url,
            &[
                ("modules", SUMMARY_MODULES.to_string()),
                ("crumb", crumb),
            ],
        )
        .await
    }

    #[instrument(skip(self), name = "yahoo::get_chart")]
    async fn get_chart(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Value> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, encode_symbol(symbol));
        let (period1, period2) = unix_range(start, end);
        self.get_json(
            &url,
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self), name = "yahoo::get_quote_summary")]
    async fn get_quote_summary(&self, symbol: &str) -> Result<Value> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.base_url,
            encode_symbol(symbol)
        );
        let (status, body) = self.summary_request(&url).await?;

        let (status, body) = if status == StatusCode::UNAUTHORIZED {
            warn!(symbol, "session crumb rejected — refreshing");
            *self.crumb.lock().await = None;
            self.summary_request(&url).await?
        } else {
            (status, body)
        };

        ensure_success(&url, status, body)
    }
}

impl MarketDataProvider for YahooFinanceClient {
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AnalyticsResult<PriceSeries> {
        let body = self.get_chart(symbol, start, end).await.map_err(|e| {
            warn!(symbol, error = %e, "chart request failed");
            AnalyticsError::upstream(format!("Error fetching stock data: {e:#}"))
        })?;

        let series = parse_chart(symbol, &body)?;
        debug!(symbol, points = series.len(), "price history fetched");
        Ok(series)
    }

    async fn fundamentals(&self, symbol: &str) -> AnalyticsResult<RawFundamentals> {
        let body = self.get_quote_summary(symbol).await.map_err(|e| {
            warn!(symbol, error = %e, "quote summary request failed");
            AnalyticsError::upstream(format!("Error fetching financial metrics: {e:#}"))
        })?;

        parse_quote_summary(symbol, &body)
    }
}

fn ensure_success(url: &str, status: StatusCode, body: Value) -> Result<Value> {
    if !status.is_success() {
        anyhow::bail!("Yahoo GET {} returned {}: {}", url, status, body);
    }
    Ok(body)
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Extract the crumb from a `getcrumb` body. Yahoo answers with the bare token
/// as plain text; HTML consent pages, JSON errors and rate-limit messages are
/// not crumbs.
pub fn parse_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    let plausible = !crumb.is_empty()
        && crumb.len() <= 64
        && !crumb.starts_with(['<', '{'])
        && !crumb.chars().any(char::is_whitespace);
    plausible.then(|| crumb.to_string())
}

/// Turn a v8 chart payload into a validated daily series.
///
/// Timestamps are shifted by the exchange's `gmtoffset` before taking the
/// calendar date. Rows with a null close are skipped, and when two rows fall
/// on the same exchange date the later one wins.
pub fn parse_chart(symbol: &str, body: &Value) -> AnalyticsResult<PriceSeries> {
    let chart = &body["chart"];
    if let Some(description) = chart["error"]["description"].as_str() {
        return Err(AnalyticsError::upstream(format!(
            "Error fetching stock data: {description}"
        )));
    }

    let result = &chart["result"][0];
    let no_data = || {
        AnalyticsError::upstream(format!(
            "No data found for {symbol} in the specified date range"
        ))
    };

    let timestamps = result["timestamp"].as_array().ok_or_else(no_data)?;
    let quote = &result["indicators"]["quote"][0];
    let gmtoffset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());

    for (i, ts) in timestamps.iter().enumerate() {
        let Some(ts) = ts.as_i64() else { continue };
        let Some(close) = quote["close"][i].as_f64() else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(ts + gmtoffset, 0).map(|d| d.date_naive())
        else {
            warn!(symbol, ts, "skipping row with out-of-range timestamp");
            continue;
        };

        let open = quote["open"][i].as_f64().unwrap_or(close);
        let high = quote["high"][i].as_f64().unwrap_or(close);
        let low = quote["low"][i].as_f64().unwrap_or(close);
        let volume = quote["volume"][i]
            .as_u64()
            .or_else(|| quote["volume"][i].as_f64().map(|v| v.max(0.0) as u64))
            .unwrap_or(0);

        let point = PricePoint::new(date, open, high, low, close, volume);

        match points.last() {
            Some(last) if last.date == date => {
                if let Some(slot) = points.last_mut() {
                    *slot = point;
                }
            }
            Some(last) if last.date > date => {
                warn!(symbol, %date, "skipping out-of-order chart row");
            }
            _ => points.push(point),
        }
    }

    if points.is_empty() {
        return Err(no_data());
    }

    PriceSeries::new(points)
}

/// Extract the five fundamentals from a quoteSummary payload. Missing modules
/// or fields are reported as absent.
pub fn parse_quote_summary(symbol: &str, body: &Value) -> AnalyticsResult<RawFundamentals> {
    let summary = &body["quoteSummary"];
    if let Some(description) = summary["error"]["description"].as_str() {
        return Err(AnalyticsError::upstream(format!(
            "Error fetching financial metrics for {symbol}: {description}"
        )));
    }

    let result = &summary["result"][0];
    if result.is_null() {
        return Err(AnalyticsError::upstream(format!(
            "no quote summary returned for {symbol}"
        )));
    }

    let detail = &result["summaryDetail"];
    let financial = &result["financialData"];

    Ok(RawFundamentals {
        trailing_pe: raw_number(&detail["trailingPE"]),
        return_on_equity: raw_number(&financial["returnOnEquity"]),
        return_on_assets: raw_number(&financial["returnOnAssets"]),
        dividend_yield: raw_number(&detail["dividendYield"]),
        payout_ratio: raw_number(&detail["payoutRatio"]),
    })
}

/// Yahoo wraps numbers as `{"raw": 0.12, "fmt": "12%"}`; bare numbers are
/// accepted too.
fn raw_number(field: &Value) -> Option<f64> {
    field["raw"]
        .as_f64()
        .or_else(|| field.as_f64())
        .filter(|v| v.is_finite())
}

// =============================================================================
// Helpers
// =============================================================================

/// Index symbols such as `^TASI.SR` carry a caret that must be escaped in the
/// path.
fn encode_symbol(symbol: &str) -> String {
    symbol.replace('^', "%5E")
}

/// Unix-second bounds covering `start` through the whole of `end`.
fn unix_range(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp();
    let after_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
    (midnight(start), midnight(after_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crumb_is_the_trimmed_plain_text_body() {
        assert_eq!(parse_crumb("Bn0QX6bV0Ss\n").as_deref(), Some("Bn0QX6bV0Ss"));
        assert_eq!(parse_crumb("a.b/c9").as_deref(), Some("a.b/c9"));
    }

    #[test]
    fn error_bodies_are_not_crumbs() {
        assert!(parse_crumb("").is_none());
        assert!(parse_crumb("   ").is_none());
        assert!(parse_crumb("Too Many Requests").is_none());
        assert!(parse_crumb("<html><body>consent</body></html>").is_none());
        assert!(parse_crumb(r#"{"finance":{"error":{"code":"Unauthorized"}}}"#).is_none());
    }

    #[test]
    fn rejected_crumb_status_is_an_error() {
        let body = json!({
            "finance": {
                "result": null,
                "error": { "code": "Unauthorized", "description": "Invalid Crumb" }
            }
        });
        let err = ensure_success("quoteSummary", StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid Crumb"));
        assert!(ensure_success("chart", StatusCode::OK, json!({})).is_ok());
    }

    fn chart_payload() -> Value {
        // 2024-01-07 .. 2024-01-10 10:00 Riyadh (UTC+3) => 07:00 UTC.
        json!({
            "chart": {
                "result": [{
                    "meta": { "currency": "SAR", "symbol": "2222.SR", "gmtoffset": 10800 },
                    "timestamp": [1704610800, 1704697200, 1704783600, 1704870000],
                    "indicators": {
                        "quote": [{
                            "open":   [31.0, 31.2, null, 31.6],
                            "high":   [31.4, 31.5, null, 31.9],
                            "low":    [30.9, 31.0, null, 31.4],
                            "close":  [31.3, 31.1, null, 31.8],
                            "volume": [1200000, 980000, null, 1500000]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn chart_rows_become_exchange_dated_points() {
        let series = parse_chart("2222.SR", &chart_payload()).unwrap();
        assert_eq!(series.len(), 3);
        let first = &series.points()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(first.close, 31.3);
        assert_eq!(first.volume, 1_200_000);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn gmtoffset_moves_late_utc_rows_to_next_local_day() {
        // 2024-01-07 22:00 UTC is already 2024-01-08 in Riyadh.
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 10800 },
                    "timestamp": [1704664800],
                    "indicators": { "quote": [{ "close": [30.0] }] }
                }]
            }
        });
        let series = parse_chart("2222.SR", &body).unwrap();
        assert_eq!(series.points()[0].date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        // Missing OHLC fall back to the close.
        assert_eq!(series.points()[0].open, 30.0);
        assert_eq!(series.points()[0].volume, 0);
    }

    #[test]
    fn duplicate_dates_keep_the_later_row() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 0 },
                    "timestamp": [1704610800, 1704625200],
                    "indicators": { "quote": [{ "close": [10.0, 10.5] }] }
                }]
            }
        });
        let series = parse_chart("1010.SR", &body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].close, 10.5);
    }

    #[test]
    fn chart_error_and_empty_result_are_upstream_failures() {
        let err_body = json!({
            "chart": { "result": null, "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" } }
        });
        assert!(matches!(
            parse_chart("9999.SR", &err_body),
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));

        let empty = json!({
            "chart": { "result": [{ "meta": {}, "indicators": { "quote": [{}] } }], "error": null }
        });
        assert!(matches!(
            parse_chart("2222.SR", &empty),
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));

        let all_null = json!({
            "chart": { "result": [{
                "timestamp": [1704610800],
                "indicators": { "quote": [{ "close": [null] }] }
            }] }
        });
        assert!(matches!(
            parse_chart("2222.SR", &all_null),
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn quote_summary_reads_raw_values() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {
                        "trailingPE": { "raw": 16.21, "fmt": "16.21" },
                        "dividendYield": { "raw": 0.0587, "fmt": "5.87%" },
                        "payoutRatio": { "raw": 0.9512, "fmt": "95.12%" }
                    },
                    "financialData": {
                        "returnOnEquity": { "raw": 0.2417, "fmt": "24.17%" },
                        "returnOnAssets": {}
                    }
                }],
                "error": null
            }
        });
        let raw = parse_quote_summary("2222.SR", &body).unwrap();
        assert_eq!(raw.trailing_pe, Some(16.21));
        assert_eq!(raw.dividend_yield, Some(0.0587));
        assert_eq!(raw.payout_ratio, Some(0.9512));
        assert_eq!(raw.return_on_equity, Some(0.2417));
        assert_eq!(raw.return_on_assets, None);
    }

    #[test]
    fn quote_summary_error_is_upstream_failure() {
        let body = json!({
            "quoteSummary": { "result": null, "error": { "code": "Not Found", "description": "Quote not found" } }
        });
        assert!(matches!(
            parse_quote_summary("0000.SR", &body),
            Err(AnalyticsError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn index_symbols_are_escaped_and_range_covers_end_day() {
        assert_eq!(encode_symbol("^TASI.SR"), "%5ETASI.SR");
        assert_eq!(encode_symbol("2222.SR"), "2222.SR");

        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (p1, p2) = unix_range(d, d);
        assert_eq!(p1, 1_704_067_200);
        assert_eq!(p2 - p1, 86_400);
    }
}
