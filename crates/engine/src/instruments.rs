//! Instrument master retrieval and token lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use common::{Error, InstrumentMaster, InstrumentRow, Result};

/// Factor applied to a requested strike before comparing it with the
/// master file's `strike` column, which is stored at 100x the quoted strike.
pub const STRIKE_SCALE: f64 = 100.0;

const OPTION_TYPES: [&str; 2] = ["OPTSTK", "OPTIDX"];

/// Downloads the broker's public scrip-master JSON.
pub struct ScripMasterClient {
    url: String,
    http: Client,
}

impl ScripMasterClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl InstrumentMaster for ScripMasterClient {
    async fn fetch_instruments(&self) -> Result<Vec<InstrumentRow>> {
        debug!(url = %self.url, "Downloading instrument master");
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("instrument master: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Collaborator(format!("instrument master: HTTP {status}")));
        }

        let rows: Vec<InstrumentRow> = resp
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("instrument master: {e}")))?;
        info!(rows = rows.len(), "Instrument master loaded");
        Ok(rows)
    }
}

/// What to look up in the instrument master.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenQuery {
    pub exch_seg: String,
    pub instrument_type: String,
    pub name: String,
    /// Strike as quoted; scaled by [`STRIKE_SCALE`] during lookup.
    pub strike_price: f64,
    /// Option side, `PE` or `CE`.
    pub pe_ce: String,
}

impl TokenQuery {
    /// An index option on the F&O segment.
    pub fn index_option(
        name: impl Into<String>,
        strike_price: f64,
        pe_ce: impl Into<String>,
    ) -> Self {
        Self {
            exch_seg: "NFO".into(),
            instrument_type: "OPTIDX".into(),
            name: name.into(),
            strike_price,
            pe_ce: pe_ce.into(),
        }
    }

    fn is_option(&self) -> bool {
        self.exch_seg == "NFO" && OPTION_TYPES.contains(&self.instrument_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenLookup {
    /// Option queries resolve to at most one contract.
    Contract(Option<InstrumentRow>),
    /// Any other query returns the whole F&O segment.
    Segment(Vec<InstrumentRow>),
}

/// Resolve a query against master rows.
pub fn lookup(rows: Vec<InstrumentRow>, query: &TokenQuery) -> TokenLookup {
    if !query.is_option() {
        return TokenLookup::Segment(rows.into_iter().filter(|r| r.exch_seg == "NFO").collect());
    }

    let strike = query.strike_price * STRIKE_SCALE;
    let side = query.pe_ce.to_uppercase();
    TokenLookup::Contract(rows.into_iter().find(|r| {
        r.exch_seg == "NFO"
            && r.instrumenttype == query.instrument_type
            && r.name == query.name
            && r.strike == strike
            && r.symbol.ends_with(&side)
    }))
}

/// Fetch the master file and resolve the query in one step.
pub async fn resolve_token(
    master: &dyn InstrumentMaster,
    query: &TokenQuery,
) -> Result<TokenLookup> {
    let rows = master.fetch_instruments().await?;
    Ok(lookup(rows, query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, name: &str, strike: f64, itype: &str, seg: &str) -> InstrumentRow {
        InstrumentRow {
            token: format!("{symbol}-tok"),
            symbol: symbol.into(),
            name: name.into(),
            expiry: "26DEC2024".into(),
            strike,
            lotsize: "25".into(),
            instrumenttype: itype.into(),
            exch_seg: seg.into(),
            tick_size: "5.000000".into(),
        }
    }

    fn master() -> Vec<InstrumentRow> {
        vec![
            row("NIFTY26DEC2419500PE", "NIFTY", 1_950_000.0, "OPTIDX", "NFO"),
            row("NIFTY26DEC2419500CE", "NIFTY", 1_950_000.0, "OPTIDX", "NFO"),
            row("NIFTY26DEC2419600CE", "NIFTY", 1_960_000.0, "OPTIDX", "NFO"),
            row("NIFTY26DECFUT", "NIFTY", -1.0, "FUTIDX", "NFO"),
            row("RELIANCE-EQ", "RELIANCE", -1.0, "", "NSE"),
        ]
    }

    #[test]
    fn strike_is_scaled_before_matching() {
        let q = TokenQuery::index_option("NIFTY", 19500.0, "CE");
        match lookup(master(), &q) {
            TokenLookup::Contract(Some(r)) => assert_eq!(r.symbol, "NIFTY26DEC2419500CE"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn side_selects_put() {
        let q = TokenQuery::index_option("NIFTY", 19500.0, "pe");
        match lookup(master(), &q) {
            TokenLookup::Contract(Some(r)) => assert_eq!(r.symbol, "NIFTY26DEC2419500PE"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_strike_is_none() {
        let q = TokenQuery::index_option("NIFTY", 19550.0, "CE");
        assert_eq!(lookup(master(), &q), TokenLookup::Contract(None));
    }

    #[test]
    fn non_option_query_returns_segment() {
        let q = TokenQuery {
            instrument_type: "FUTIDX".into(),
            ..TokenQuery::index_option("NIFTY", 0.0, "")
        };
        match lookup(master(), &q) {
            TokenLookup::Segment(rows) => {
                assert_eq!(rows.len(), 4);
                assert!(rows.iter().all(|r| r.exch_seg == "NFO"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn contract_serializes_as_row_or_null() {
        assert_eq!(
            serde_json::to_value(TokenLookup::Contract(None)).unwrap(),
            serde_json::Value::Null
        );
        let q = TokenQuery::index_option("NIFTY", 19600.0, "CE");
        let v = serde_json::to_value(lookup(master(), &q)).unwrap();
        assert_eq!(v["symbol"], "NIFTY26DEC2419600CE");
    }
}
