use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Column order of a broker historic-candle row.
pub const CANDLE_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// One OHLCV record for a fixed interval, tagged with instrument identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub symbol: String,
    /// `None` for instruments without an expiry (cash segment).
    pub expiry: Option<NaiveDate>,
}

/// Instrument identity as sent by API clients when requesting candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub exch_seg: String,
    pub token: String,
    pub symbol: String,
    #[serde(default)]
    pub expiry: String,
}

impl SymbolInfo {
    pub fn expiry_date(&self) -> Result<Option<NaiveDate>> {
        parse_expiry(&self.expiry)
    }
}

/// Parse a broker expiry such as `26DEC2024`, or an ISO `2024-12-26`.
/// Blank input means the instrument does not expire.
pub fn parse_expiry(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%d%b%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map(Some)
        .map_err(|_| Error::Validation(format!("unrecognised expiry '{raw}'")))
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Live market values a single decision is computed from.
///
/// Only constructible through [`MarketSnapshot::new`] or
/// [`MarketSnapshot::from_json`], so every field a strategy sees is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketSnapshot {
    current_price: f64,
    previous_high: f64,
    previous_low: f64,
    current_volume: f64,
    average_volume: f64,
}

impl MarketSnapshot {
    pub const FIELDS: [&'static str; 5] = [
        "current_price",
        "previous_high",
        "previous_low",
        "current_volume",
        "average_volume",
    ];

    pub fn new(
        current_price: f64,
        previous_high: f64,
        previous_low: f64,
        current_volume: f64,
        average_volume: f64,
    ) -> Result<Self> {
        let values = [
            current_price,
            previous_high,
            previous_low,
            current_volume,
            average_volume,
        ];
        for (name, value) in Self::FIELDS.iter().zip(values) {
            if !value.is_finite() {
                return Err(Error::Validation(format!(
                    "Field '{name}' must be a finite number, got {value}"
                )));
            }
        }
        Ok(Self {
            current_price,
            previous_high,
            previous_low,
            current_volume,
            average_volume,
        })
    }

    /// Validate an untyped request body. Unknown, missing and non-numeric
    /// fields are all rejected here, before any strategy runs.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| Error::Validation("Request body must be a JSON object".into()))?;

        let unknown: Vec<&str> = obj
            .keys()
            .map(String::as_str)
            .filter(|k| !Self::FIELDS.iter().any(|f| f == k))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::Validation(format!(
                "Unknown fields: {}",
                unknown.join(", ")
            )));
        }

        let missing: Vec<&str> = Self::FIELDS
            .iter()
            .copied()
            .filter(|f| obj.get(*f).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let field = |name: &str| -> Result<f64> {
            obj[name].as_f64().ok_or_else(|| {
                Error::Validation(format!("Field '{name}' must be numeric, got {}", obj[name]))
            })
        };

        Self::new(
            field("current_price")?,
            field("previous_high")?,
            field("previous_low")?,
            field("current_volume")?,
            field("average_volume")?,
        )
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn previous_high(&self) -> f64 {
        self.previous_high
    }

    pub fn previous_low(&self) -> f64 {
        self.previous_low
    }

    pub fn current_volume(&self) -> f64 {
        self.current_volume
    }

    pub fn average_volume(&self) -> f64 {
        self.average_volume
    }
}

/// Outcome of one pipeline run: at most one trading action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Decision {
    Buy { price: f64, strategy: String },
    Sell { price: f64, strategy: String },
    None,
}

impl Decision {
    pub fn new(side: OrderSide, price: f64, strategy: impl Into<String>) -> Self {
        let strategy = strategy.into();
        match side {
            OrderSide::Buy => Decision::Buy { price, strategy },
            OrderSide::Sell => Decision::Sell { price, strategy },
        }
    }

    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Decision::Buy { .. } => Some(OrderSide::Buy),
            Decision::Sell { .. } => Some(OrderSide::Sell),
            Decision::None => None,
        }
    }

    pub fn strategy(&self) -> Option<&str> {
        match self {
            Decision::Buy { strategy, .. } | Decision::Sell { strategy, .. } => Some(strategy),
            Decision::None => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Decision::Buy { price, .. } | Decision::Sell { price, .. } => Some(*price),
            Decision::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Decision::None)
    }

    /// Human-readable outcome returned by `/take_order`.
    pub fn message(&self) -> String {
        match self {
            Decision::Buy { strategy, .. } => format!("Buy order placed using {strategy} strategy"),
            Decision::Sell { strategy, .. } => {
                format!("Sell order placed using {strategy} strategy")
            }
            Decision::None => "No trade executed".to_string(),
        }
    }
}

/// An order handed to the dispatcher after a strategy fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: String,
    pub side: OrderSide,
    pub price: f64,
    pub strategy: String,
    pub created_at: DateTime<Utc>,
}

impl OrderRequest {
    /// Build an order from a decision. Returns `None` for `Decision::None`.
    pub fn from_decision(decision: &Decision) -> Option<Self> {
        match decision {
            Decision::Buy { price, strategy } | Decision::Sell { price, strategy } => Some(Self {
                id: uuid::Uuid::new_v4().to_string(),
                side: decision.side()?,
                price: *price,
                strategy: strategy.clone(),
                created_at: Utc::now(),
            }),
            Decision::None => None,
        }
    }
}

/// One row of the broker's instrument master file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRow {
    pub token: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(deserialize_with = "de_strike")]
    pub strike: f64,
    #[serde(default)]
    pub lotsize: String,
    pub instrumenttype: String,
    pub exch_seg: String,
    #[serde(default)]
    pub tick_size: String,
}

/// The master file ships strikes as strings (`"1950000.000000"`).
fn de_strike<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("strike out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "strike must be a number or numeric string, got {other}"
        ))),
    }
}
