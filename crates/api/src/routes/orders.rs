use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use common::MarketSnapshot;

use crate::{ApiError, AppState};

const ORDER_FAILED: &str = "Error in taking order";

pub fn orders_router() -> Router<AppState> {
    Router::new().route("/take_order", post(take_order))
}

#[derive(Serialize)]
struct TakeOrderResponse {
    message: String,
}

/// Validate the snapshot, run the decision pipeline, report which strategy fired.
async fn take_order(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TakeOrderResponse>, ApiError> {
    let Json(body) = body.map_err(|r| ApiError::rejected(ORDER_FAILED, r))?;
    let snapshot =
        MarketSnapshot::from_json(&body).map_err(|e| ApiError::new(ORDER_FAILED, e))?;

    let decision = state.pipeline.execute(&snapshot).await;
    Ok(Json(TakeOrderResponse {
        message: decision.message(),
    }))
}
