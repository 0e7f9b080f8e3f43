use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use common::{BrokerApi, Error, HistoricParams, LoginCredentials, Result, Session};

const LOGIN_PATH: &str = "/rest/auth/angelbroking/user/v1/loginByPassword";
const REFRESH_PATH: &str = "/rest/auth/angelbroking/jwt/v1/generateTokens";
const PROFILE_PATH: &str = "/rest/secure/angelbroking/user/v1/getProfile";
const CANDLE_PATH: &str = "/rest/secure/angelbroking/historical/v1/getCandleData";

/// REST client for the Angel One SmartAPI. Used for sessions and historic candles.
///
/// Every request is bounded by the client-level timeout and attempted once.
pub struct SmartApiClient {
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl SmartApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str, api_key: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("X-PrivateKey", api_key)
            .header("X-UserType", "USER")
            .header("X-SourceID", "WEB")
            .header("X-ClientLocalIP", "127.0.0.1")
            .header("X-ClientPublicIP", "127.0.0.1")
            .header("X-MACAddress", "00:00:00:00:00:00")
            .header("Accept", "application/json")
    }

    fn secure(&self, method: reqwest::Method, path: &str, session: &Session) -> RequestBuilder {
        self.request(method, path, &session.api_key)
            .bearer_auth(&session.jwt_token)
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        self.send_raw(path, request).await?.into_data()
    }

    async fn send_raw<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Envelope<T>> {
        debug!(path, "SmartAPI request");
        let resp = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Error::Collaborator(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Collaborator(format!("unexpected response from {path}: {e}")))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(e.to_string())
        }
    }
}

#[async_trait]
impl BrokerApi for SmartApiClient {
    async fn generate_session(
        &self,
        api_key: &str,
        credentials: &LoginCredentials,
    ) -> Result<Session> {
        let body = json!({
            "clientcode": credentials.username,
            "password": credentials.password,
            "totp": credentials.totp.as_deref().unwrap_or_default(),
        });
        let request = self
            .request(reqwest::Method::POST, LOGIN_PATH, api_key)
            .json(&body);
        let tokens: TokenData = self.send(LOGIN_PATH, request).await?;
        Ok(tokens.into_session(api_key))
    }

    async fn generate_session_with_refresh_token(
        &self,
        api_key: &str,
        refresh_token: &str,
    ) -> Result<Session> {
        let request = self
            .request(reqwest::Method::POST, REFRESH_PATH, api_key)
            .json(&json!({ "refreshToken": refresh_token }));
        let tokens: TokenData = self.send(REFRESH_PATH, request).await?;
        Ok(tokens.into_session(api_key))
    }

    async fn get_profile(&self, session: &Session) -> Result<Value> {
        let request = self
            .secure(reqwest::Method::GET, PROFILE_PATH, session)
            .query(&[("refreshToken", session.refresh_token.as_str())]);
        self.send(PROFILE_PATH, request).await
    }

    async fn get_candle_data(
        &self,
        session: &Session,
        params: &HistoricParams,
    ) -> Result<Vec<Vec<Value>>> {
        debug!(token = %params.symboltoken, interval = %params.interval, "Fetching candles");
        let request = self
            .secure(reqwest::Method::POST, CANDLE_PATH, session)
            .json(params);
        self.send_raw(CANDLE_PATH, request).await?.into_rows()
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

/// Every SmartAPI response wraps its payload in this envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    errorcode: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T> {
        if !self.status {
            return Err(Error::Collaborator(format!(
                "{} ({})",
                self.message, self.errorcode
            )));
        }
        self.data
            .ok_or_else(|| Error::Collaborator(format!("empty response: {}", self.message)))
    }
}

impl Envelope<Vec<Vec<Value>>> {
    /// The broker answers `data: null` when the window has no candles.
    fn into_rows(self) -> Result<Vec<Vec<Value>>> {
        if self.status && self.data.is_none() {
            return Ok(Vec::new());
        }
        self.into_data()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenData {
    jwt_token: String,
    refresh_token: String,
    #[serde(default)]
    feed_token: String,
}

impl TokenData {
    fn into_session(self, api_key: &str) -> Session {
        Session {
            api_key: api_key.to_string(),
            jwt_token: self.jwt_token,
            refresh_token: self.refresh_token,
            feed_token: self.feed_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_unwraps_tokens() {
        let env: Envelope<TokenData> = serde_json::from_str(
            r#"{"status":true,"message":"SUCCESS","errorcode":"",
                "data":{"jwtToken":"jwt","refreshToken":"rt","feedToken":"ft"}}"#,
        )
        .unwrap();
        let session = env.into_data().unwrap().into_session("key");
        assert_eq!(session.jwt_token, "jwt");
        assert_eq!(session.refresh_token, "rt");
        assert_eq!(session.feed_token(), "ft");
        assert_eq!(session.api_key, "key");
    }

    #[test]
    fn failed_envelope_is_collaborator_error() {
        let env: Envelope<TokenData> = serde_json::from_str(
            r#"{"status":false,"message":"Invalid Token","errorcode":"AG8001","data":null}"#,
        )
        .unwrap();
        let err = env.into_data().unwrap_err();
        assert!(matches!(err, Error::Collaborator(ref m) if m.contains("AG8001")));
    }

    #[test]
    fn null_candle_data_is_empty() {
        let env: Envelope<Vec<Vec<Value>>> =
            serde_json::from_str(r#"{"status":true,"message":"SUCCESS","data":null}"#).unwrap();
        assert!(env.into_rows().unwrap().is_empty());
    }

    #[test]
    fn candle_rows_deserialize() {
        let env: Envelope<Vec<Vec<Value>>> = serde_json::from_str(
            r#"{"status":true,"message":"SUCCESS","data":[["2024-01-02T09:15:00+05:30",1,2,0.5,1.5,100]]}"#,
        )
        .unwrap();
        let rows = env.into_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 6);
    }
}
