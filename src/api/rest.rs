// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Thin, stateless views over the market data engine's read interface. The
// engine itself never raises across this boundary: unknown pairs come back as
// empty arrays, and a too-short series is reported by this layer as 404.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::analytics::alerts::{self, AlertSnapshot};
use crate::analytics::bands::{zscore_bands, ZScoreBands};
use crate::market_data::MarketDataService;

/// Interval the bands view is computed over.
const BANDS_INTERVAL: &str = "1h";
/// Candles fetched as context for the bands window.
const BANDS_CONTEXT: usize = 50;
/// Rolling window of the bands calculation.
const BANDS_PERIOD: usize = 20;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(service: Arc<MarketDataService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/admin/system-status", get(system_status))
        .route("/history", get(history))
        .route("/bands", get(bands))
        .route("/alerts/evaluate", post(evaluate_alert))
        .layer(cors)
        .with_state(service)
}

// =============================================================================
// Banner & health
// =============================================================================

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    service: &'static str,
}

async fn root() -> impl IntoResponse {
    Json(RootResponse {
        status: "online",
        service: "QuantDesk Market Data API",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

/// Liveness only. Healthy as soon as the process is up; backfill progress is
/// intentionally not a readiness condition.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "operational",
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Admin status
// =============================================================================

async fn system_status(State(service): State<Arc<MarketDataService>>) -> impl IntoResponse {
    Json(service.status())
}

// =============================================================================
// Price history
// =============================================================================

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_interval() -> String {
    "1m".to_string()
}

fn default_limit() -> usize {
    300
}

#[derive(Deserialize)]
struct HistoryParams {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default = "default_interval")]
    interval: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

/// Snapshot of the rolling candle history. An unknown pair is an empty array
/// with HTTP 200, which clients interpret as "no data yet".
async fn history(
    State(service): State<Arc<MarketDataService>>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let candles = service.candles(&params.symbol, &params.interval, params.limit);
    Json(candles)
}

// =============================================================================
// Volatility bands
// =============================================================================

#[derive(Deserialize)]
struct BandsParams {
    #[serde(default = "default_symbol")]
    symbol: String,
}

#[derive(Serialize)]
struct BandsResponse {
    symbol: String,
    period: &'static str,
    #[serde(flatten)]
    bands: ZScoreBands,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: &'static str,
}

/// Z-score bands over the hourly series.
async fn bands(
    State(service): State<Arc<MarketDataService>>,
    Query(params): Query<BandsParams>,
) -> impl IntoResponse {
    let closes = service.closes(&params.symbol, BANDS_INTERVAL, BANDS_CONTEXT);

    match zscore_bands(&closes, BANDS_PERIOD) {
        Some(bands) => Json(BandsResponse {
            symbol: params.symbol,
            period: "20h",
            bands,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                detail: "insufficient data for band calculation",
            }),
        )
            .into_response(),
    }
}

// =============================================================================
// Alert evaluation
// =============================================================================

async fn evaluate_alert(Json(snapshot): Json<AlertSnapshot>) -> impl IntoResponse {
    Json(alerts::evaluate(&snapshot))
}
