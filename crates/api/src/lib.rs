mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{BrokerApi, InstrumentMaster};
use engine::CandleService;
use strategy::DecisionPipeline;

pub use error::ApiError;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<dyn BrokerApi>,
    pub candles: Arc<CandleService>,
    pub instruments: Arc<dyn InstrumentMaster>,
    pub pipeline: Arc<DecisionPipeline>,
}

/// All routes with state attached.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::index_router())
        .merge(routes::health_router())
        .merge(routes::session_router())
        .merge(routes::market_router())
        .merge(routes::orders_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the HTTP server until the listener fails.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server running");
    axum::serve(listener, router(state)).await
}
