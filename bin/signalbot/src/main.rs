use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{BrokerApi, Config, InstrumentMaster, OrderDispatcher};
use engine::{CandleService, ScripMasterClient, SmartApiClient};
use paper::PaperDispatcher;
use strategy::{DecisionPipeline, StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(port = cfg.port, timeout_secs = cfg.fetch_timeout.as_secs(), "SignalBot starting");

    // ── Strategies ────────────────────────────────────────────────────────────
    let registry = match &cfg.strategy_config_path {
        Some(path) => {
            let file = StrategyFileConfig::load(path)?;
            StrategyRegistry::from_config(&file)
                .with_context(|| format!("invalid strategy config at '{path}'"))?
        }
        None => StrategyRegistry::standard(),
    };

    // ── Collaborators ─────────────────────────────────────────────────────────
    let broker: Arc<dyn BrokerApi> = Arc::new(
        SmartApiClient::new(&cfg.smartapi_base_url, cfg.fetch_timeout)
            .context("failed to build SmartAPI client")?,
    );
    let instruments: Arc<dyn InstrumentMaster> = Arc::new(
        ScripMasterClient::new(&cfg.scrip_master_url, cfg.fetch_timeout)
            .context("failed to build scrip master client")?,
    );
    let dispatcher: Arc<dyn OrderDispatcher> = Arc::new(PaperDispatcher::new());

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let state = api::AppState {
        candles: Arc::new(CandleService::new(
            broker.clone(),
            cfg.candle_interval.clone(),
            cfg.history_lookback_days,
            cfg.fetch_timeout,
        )),
        broker,
        instruments,
        pipeline: Arc::new(DecisionPipeline::new(registry, dispatcher)),
    };

    let server = tokio::spawn(api::serve(state, cfg.port));

    tokio::select! {
        res = server => {
            match res {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server failed");
                    return Err(e).context("HTTP server failed");
                }
                Err(e) => return Err(e).context("HTTP server task panicked"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
        }
    }
    Ok(())
}
