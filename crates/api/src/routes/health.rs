use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn index_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn index() -> &'static str {
    "Index Page"
}

/// Health check endpoint. Lists the registered strategies in priority order.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "strategies": state.pipeline.registry().labels(),
    }))
}
