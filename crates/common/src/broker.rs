use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{InstrumentRow, OrderRequest, Result};

/// Credentials for a password login against the brokerage.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
    /// Time-based one-time password, required by most brokerage accounts.
    #[serde(default)]
    pub totp: Option<String>,
}

/// An authenticated brokerage session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub api_key: String,
    pub jwt_token: String,
    pub refresh_token: String,
    pub feed_token: String,
}

impl Session {
    /// Token for the market-data feed issued alongside the session.
    pub fn feed_token(&self) -> &str {
        &self.feed_token
    }
}

/// Parameters of a historic candle request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricParams {
    pub exchange: String,
    pub symboltoken: String,
    pub interval: String,
    /// `YYYY-MM-DD HH:MM`
    pub fromdate: String,
    /// `YYYY-MM-DD HH:MM`
    pub todate: String,
}

/// Abstraction over the brokerage REST API.
///
/// `SmartApiClient` in `crates/engine` implements this for Angel One.
/// Every call is a single attempt; retries are never layered on top.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Log in with user credentials.
    async fn generate_session(
        &self,
        api_key: &str,
        credentials: &LoginCredentials,
    ) -> Result<Session>;

    /// Re-establish a session from a refresh token issued by an earlier login.
    async fn generate_session_with_refresh_token(
        &self,
        api_key: &str,
        refresh_token: &str,
    ) -> Result<Session>;

    /// Account profile of the logged-in user, passed through untouched.
    async fn get_profile(&self, session: &Session) -> Result<Value>;

    /// Raw positional candle rows (`timestamp, open, high, low, close, volume`).
    async fn get_candle_data(
        &self,
        session: &Session,
        params: &HistoricParams,
    ) -> Result<Vec<Vec<Value>>>;
}

/// Source of the broker's instrument master file.
#[async_trait]
pub trait InstrumentMaster: Send + Sync {
    async fn fetch_instruments(&self) -> Result<Vec<InstrumentRow>>;
}

/// Receives orders decided by the pipeline.
///
/// `PaperDispatcher` in `crates/paper` implements this. The pipeline never
/// feeds the dispatch result back into a decision.
#[async_trait]
pub trait OrderDispatcher: Send + Sync {
    async fn dispatch(&self, order: &OrderRequest) -> Result<()>;
}
