use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;

use common::{Candle, SymbolInfo};
use engine::{resolve_token, SymbolCandles, TokenLookup, TokenQuery};

use crate::{ApiError, AppState};

const CANDLE_FAILED: &str = "Error fetching candle data";
const SYMBOL_FAILED: &str = "Error fetching symbol data";

pub fn market_router() -> Router<AppState> {
    Router::new()
        .route("/get_candle_data", post(get_candle_data))
        .route("/get_candle_data/batch", post(get_candle_data_batch))
        .route("/get_symbol_data", post(get_symbol_data))
}

// ─── Candles ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CandleRequest {
    api_key: String,
    refresh_token: String,
    symbol_info: SymbolInfo,
}

/// Session failures are errors; a failed historic fetch is an empty list.
async fn get_candle_data(
    State(state): State<AppState>,
    body: Result<Json<CandleRequest>, JsonRejection>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(CANDLE_FAILED, r))?;

    let session = state
        .broker
        .generate_session_with_refresh_token(&req.api_key, &req.refresh_token)
        .await
        .map_err(|e| ApiError::new(CANDLE_FAILED, e))?;

    let candles = state
        .candles
        .fetch_for_symbol(&session, &req.symbol_info)
        .await
        .map_err(|e| ApiError::new(CANDLE_FAILED, e))?;
    Ok(Json(candles))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchCandleRequest {
    api_key: String,
    refresh_token: String,
    symbols: Vec<SymbolInfo>,
}

/// Candles for several instruments under one session, in request order.
/// Only a session failure fails the request.
async fn get_candle_data_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchCandleRequest>, JsonRejection>,
) -> Result<Json<Vec<SymbolCandles>>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(CANDLE_FAILED, r))?;

    let session = state
        .broker
        .generate_session_with_refresh_token(&req.api_key, &req.refresh_token)
        .await
        .map_err(|e| ApiError::new(CANDLE_FAILED, e))?;

    Ok(Json(state.candles.fetch_batch(&session, &req.symbols).await))
}

// ─── Symbols ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolRequest {
    symbol: String,
    strike_price: f64,
    pe_ce: String,
}

async fn get_symbol_data(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> Result<Json<TokenLookup>, ApiError> {
    let Json(req) = body.map_err(|r| ApiError::rejected(SYMBOL_FAILED, r))?;
    let query = TokenQuery::index_option(req.symbol, req.strike_price, req.pe_ce);
    let found = resolve_token(state.instruments.as_ref(), &query)
        .await
        .map_err(|e| ApiError::new(SYMBOL_FAILED, e))?;
    Ok(Json(found))
}
