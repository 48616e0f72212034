// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Time-windowed endpoints accept a
// `period` query token (1M, 3M, 6M, 1Y, 2Y, 5Y). Errors are returned as
// `{"detail": "..."}` with a status derived from the error kind:
//
//   UnknownSymbol                                   404
//   InvalidInput / InsufficientData / DivisionByZero 400
//   UpstreamUnavailable                             502
//
// CORS origins come from the configuration file.
// =============================================================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};

use crate::app_state::AppState;
use crate::error::AnalyticsError;
use crate::market_data::MarketDataProvider;
use crate::period::Period;
use crate::screener::ScreenerWeights;
use crate::service::BatchFailure;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router<P: MarketDataProvider>(state: Arc<AppState<P>>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/v1/health", get(health::<P>))
        // ── Universe & prices ───────────────────────────────────────
        .route("/api/v1/stocks/available", get(available_stocks::<P>))
        .route("/api/v1/stocks/:symbol/history", get(stock_history::<P>))
        // ── Price analytics ─────────────────────────────────────────
        .route("/api/v1/technical/indicators/:symbol", get(technical::<P>))
        .route("/api/v1/risk/metrics/:symbol", get(risk::<P>))
        .route("/api/v1/portfolio/metrics/:symbol", get(portfolio::<P>))
        // ── Fundamentals ────────────────────────────────────────────
        .route("/api/v1/financial/metrics/:symbol", get(financial_metrics::<P>))
        .route("/api/v1/financial/comparison", get(comparison::<P>))
        .route("/api/v1/screener", post(screener::<P>))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
}

// =============================================================================
// Error mapping
// =============================================================================

/// Handler error: an `AnalyticsError` rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AnalyticsError);

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(AnalyticsError::invalid(e.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AnalyticsError::UnknownSymbol(_) => StatusCode::NOT_FOUND,
            AnalyticsError::InvalidInput(_)
            | AnalyticsError::InsufficientData(_)
            | AnalyticsError::DivisionByZero(_) => StatusCode::BAD_REQUEST,
            AnalyticsError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "request failed upstream");
        } else {
            debug!(error = %self.0, status = %status, "request rejected");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    period: Option<String>,
}

impl PeriodQuery {
    fn resolve(&self, default: Period) -> Result<Period, AnalyticsError> {
        match self.period.as_deref() {
            Some(token) => token.parse(),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    period: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

// =============================================================================
// Health
// =============================================================================

async fn health<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Universe & price history
// =============================================================================

async fn available_stocks<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> impl IntoResponse {
    Json(state.service.universe().clone())
}

async fn stock_history<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(symbol): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.company_name(&symbol)?;
    let Query(q) = query?;
    // The period token is only parsed when the explicit window is incomplete.
    let period = match (q.start_date, q.end_date) {
        (Some(_), Some(_)) => Period::SixMonths,
        _ => PeriodQuery { period: q.period }.resolve(Period::SixMonths)?,
    };

    let history = state
        .service
        .history(&symbol, period, q.start_date, q.end_date)
        .await?;
    Ok(Json(history))
}

// =============================================================================
// Technical / risk / portfolio analytics
// =============================================================================

async fn technical<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(symbol): Path<String>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.company_name(&symbol)?;
    let period = query?.resolve(Period::SixMonths)?;
    Ok(Json(state.service.technical(&symbol, period).await?))
}

async fn risk<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(symbol): Path<String>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.company_name(&symbol)?;
    let period = query?.resolve(Period::OneYear)?;
    Ok(Json(state.service.risk(&symbol, period).await?))
}

async fn portfolio<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(symbol): Path<String>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.company_name(&symbol)?;
    let period = query?.resolve(Period::OneYear)?;
    Ok(Json(state.service.relative(&symbol, period).await?))
}

// =============================================================================
// Fundamentals & screener
// =============================================================================

#[derive(Debug, Serialize)]
struct RankedResponse<T> {
    stocks: Vec<T>,
    failed: Vec<BatchFailure>,
}

async fn financial_metrics<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.financial_metrics(&symbol).await?))
}

async fn comparison<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
) -> impl IntoResponse {
    let outcome = state.service.comparison().await;
    Json(RankedResponse {
        stocks: outcome.succeeded,
        failed: outcome.failed,
    })
}

/// The body is optional: an empty body ranks with the configured default
/// weights, and omitted fields take 0.25.
async fn screener<P: MarketDataProvider>(
    State(state): State<Arc<AppState<P>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let weights = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let w: ScreenerWeights = serde_json::from_slice(&body)
            .map_err(|e| AnalyticsError::invalid(format!("malformed weights: {e}")))?;
        Some(w)
    };

    let outcome = state.service.screener(weights).await?;
    Ok(Json(RankedResponse {
        stocks: outcome.succeeded,
        failed: outcome.failed,
    }))
}
