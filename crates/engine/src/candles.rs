use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use common::{
    BrokerApi, Candle, Error, HistoricParams, Result, Session, SymbolInfo, CANDLE_COLUMNS,
};

use crate::normalizer::normalize;

/// Market session bounds used for the historic window.
const SESSION_OPEN: &str = "09:15";
const SESSION_CLOSE: &str = "15:30";

/// One instrument's series in a batch, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolCandles {
    pub symbol_info: SymbolInfo,
    pub candles: Vec<Candle>,
}

/// Fetches historic candles from the broker and normalizes them.
///
/// A failed or timed-out fetch degrades to an empty series for that symbol;
/// only malformed payloads surface as errors.
pub struct CandleService {
    broker: Arc<dyn BrokerApi>,
    interval: String,
    lookback_days: u64,
    timeout: Duration,
}

impl CandleService {
    pub fn new(
        broker: Arc<dyn BrokerApi>,
        interval: impl Into<String>,
        lookback_days: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            broker,
            interval: interval.into(),
            lookback_days,
            timeout,
        }
    }

    /// Request window ending yesterday at the close, starting `lookback_days`
    /// before `today` at the open.
    pub fn historic_params(&self, symbol: &SymbolInfo, today: NaiveDate) -> HistoricParams {
        let from = today
            .checked_sub_days(Days::new(self.lookback_days))
            .unwrap_or(NaiveDate::MIN);
        let to = today.pred_opt().unwrap_or(today);
        HistoricParams {
            exchange: symbol.exch_seg.clone(),
            symboltoken: symbol.token.clone(),
            interval: self.interval.clone(),
            fromdate: format!("{} {SESSION_OPEN}", from.format("%Y-%m-%d")),
            todate: format!("{} {SESSION_CLOSE}", to.format("%Y-%m-%d")),
        }
    }

    /// Candles for one symbol over the configured window.
    pub async fn fetch_for_symbol(
        &self,
        session: &Session,
        symbol: &SymbolInfo,
    ) -> Result<Vec<Candle>> {
        self.fetch_for_symbol_on(session, symbol, Local::now().date_naive())
            .await
    }

    pub async fn fetch_for_symbol_on(
        &self,
        session: &Session,
        symbol: &SymbolInfo,
        today: NaiveDate,
    ) -> Result<Vec<Candle>> {
        let params = self.historic_params(symbol, today);

        let fetch = self.broker.get_candle_data(session, &params);
        let fetched = tokio::time::timeout(self.timeout, fetch)
            .await
            .unwrap_or_else(|_| Err(Error::Timeout(self.timeout)));

        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    symbol = %symbol.symbol,
                    error = %e,
                    "Historic fetch failed, using empty series"
                );
                return Ok(Vec::new());
            }
        };

        let candles = normalize(&rows, &CANDLE_COLUMNS, symbol)?;
        info!(symbol = %symbol.symbol, candles = candles.len(), "Done");
        Ok(candles)
    }

    /// Candles for several symbols, fetched one after another. A symbol whose
    /// fetch fails or whose payload is malformed contributes an empty series
    /// and the batch carries on.
    pub async fn fetch_batch(
        &self,
        session: &Session,
        symbols: &[SymbolInfo],
    ) -> Vec<SymbolCandles> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let candles = match self.fetch_for_symbol(session, symbol).await {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(
                        symbol = %symbol.symbol,
                        token = %symbol.token,
                        error = %e,
                        "Dropping malformed series from batch"
                    );
                    Vec::new()
                }
            };
            out.push(SymbolCandles {
                symbol_info: symbol.clone(),
                candles,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::LoginCredentials;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned rows per token; tokens not in the map fail.
    #[derive(Default)]
    struct FakeBroker {
        rows: HashMap<String, Vec<Vec<Value>>>,
        stall: bool,
        requests: Mutex<Vec<HistoricParams>>,
    }

    #[async_trait]
    impl BrokerApi for FakeBroker {
        async fn generate_session(&self, _: &str, _: &LoginCredentials) -> Result<Session> {
            unreachable!()
        }

        async fn generate_session_with_refresh_token(&self, _: &str, _: &str) -> Result<Session> {
            unreachable!()
        }

        async fn get_profile(&self, _: &Session) -> Result<Value> {
            unreachable!()
        }

        async fn get_candle_data(
            &self,
            _: &Session,
            params: &HistoricParams,
        ) -> Result<Vec<Vec<Value>>> {
            self.requests.lock().unwrap().push(params.clone());
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.rows
                .get(&params.symboltoken)
                .cloned()
                .ok_or_else(|| Error::Collaborator("AB1004: something went wrong".into()))
        }
    }

    fn session() -> Session {
        Session {
            api_key: "key".into(),
            jwt_token: "jwt".into(),
            refresh_token: "rt".into(),
            feed_token: "ft".into(),
        }
    }

    fn symbol(token: &str, name: &str) -> SymbolInfo {
        SymbolInfo {
            exch_seg: "NSE".into(),
            token: token.into(),
            symbol: name.into(),
            expiry: String::new(),
        }
    }

    fn good_rows() -> Vec<Vec<Value>> {
        vec![
            json!([1700000000000i64, 100, 105, 95, 102, 5000]),
            json!([1700000300000i64, 102, 104, 101, 103, 4200]),
        ]
        .into_iter()
        .map(|v| v.as_array().unwrap().clone())
        .collect()
    }

    fn service(broker: Arc<FakeBroker>) -> CandleService {
        CandleService::new(broker, "FIVE_MINUTE", 90, Duration::from_secs(30))
    }

    #[test]
    fn historic_window_matches_session_hours() {
        let svc = service(Arc::default());
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let p = svc.historic_params(&symbol("2885", "RELIANCE-EQ"), today);
        assert_eq!(p.exchange, "NSE");
        assert_eq!(p.symboltoken, "2885");
        assert_eq!(p.interval, "FIVE_MINUTE");
        assert_eq!(p.fromdate, "2024-01-01 09:15");
        assert_eq!(p.todate, "2024-03-30 15:30");
    }

    #[tokio::test]
    async fn fetch_normalizes_rows() {
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([("2885".to_string(), good_rows())]),
            ..Default::default()
        });
        let candles = service(broker.clone())
            .fetch_for_symbol(&session(), &symbol("2885", "RELIANCE-EQ"))
            .await
            .unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles.iter().all(|c| c.symbol == "RELIANCE-EQ"));
        assert_eq!(broker.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_yields_empty_series() {
        let candles = service(Arc::default())
            .fetch_for_symbol(&session(), &symbol("999", "MISSING"))
            .await
            .unwrap();
        assert!(candles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_fetch_times_out_to_empty_series() {
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([("2885".to_string(), good_rows())]),
            stall: true,
            ..Default::default()
        });
        let candles = service(broker)
            .fetch_for_symbol(&session(), &symbol("2885", "RELIANCE-EQ"))
            .await
            .unwrap();
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([(
                "2885".to_string(),
                vec![json!([1700000000000i64, 100]).as_array().unwrap().clone()],
            )]),
            ..Default::default()
        });
        let err = service(broker)
            .fetch_for_symbol(&session(), &symbol("2885", "RELIANCE-EQ"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedRow { row: 0, .. }));
    }

    fn counts(out: &[SymbolCandles]) -> Vec<(&str, usize)> {
        out.iter()
            .map(|s| (s.symbol_info.token.as_str(), s.candles.len()))
            .collect()
    }

    #[tokio::test]
    async fn batch_survives_a_failed_symbol() {
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([
                ("1".to_string(), good_rows()),
                ("3".to_string(), good_rows()),
            ]),
            ..Default::default()
        });
        let symbols = [symbol("1", "A"), symbol("2", "B"), symbol("3", "C")];
        let out = service(broker.clone()).fetch_batch(&session(), &symbols).await;
        assert_eq!(counts(&out), vec![("1", 2), ("2", 0), ("3", 2)]);
        assert_eq!(broker.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn batch_survives_a_malformed_symbol() {
        let short = vec![json!([1700000000000i64, 100]).as_array().unwrap().clone()];
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([("1".to_string(), good_rows()), ("2".to_string(), short)]),
            ..Default::default()
        });
        let symbols = [symbol("1", "A"), symbol("2", "B")];
        let out = service(broker).fetch_batch(&session(), &symbols).await;
        assert_eq!(counts(&out), vec![("1", 2), ("2", 0)]);
    }

    #[tokio::test]
    async fn batch_keeps_instruments_sharing_a_symbol_apart() {
        let broker = Arc::new(FakeBroker {
            rows: HashMap::from([("1".to_string(), good_rows())]),
            ..Default::default()
        });
        let symbols = [symbol("1", "X"), symbol("404", "X")];
        let out = service(broker).fetch_batch(&session(), &symbols).await;
        assert_eq!(counts(&out), vec![("1", 2), ("404", 0)]);
        assert_eq!(out[0].symbol_info, symbols[0]);
    }
}
