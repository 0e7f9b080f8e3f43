//! Conversion of raw broker candle rows into canonical [`Candle`] series.

use chrono::{DateTime, Utc};
use serde_json::Value;

use common::{Candle, Error, Result, SymbolInfo, CANDLE_COLUMNS};

/// Positions of each canonical field inside a raw row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnIndex {
    /// `columns` must name every canonical field exactly once and nothing else.
    fn resolve<S: AsRef<str>>(columns: &[S]) -> Result<Self> {
        let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();

        if let Some(unknown) = names
            .iter()
            .find(|c| !CANDLE_COLUMNS.iter().any(|k| k == *c))
        {
            return Err(Error::ColumnContract(format!("unknown column '{unknown}'")));
        }

        let position = |name: &str| -> Result<usize> {
            let mut hits = names
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == name)
                .map(|(i, _)| i);
            match (hits.next(), hits.next()) {
                (Some(i), None) => Ok(i),
                (None, _) => Err(Error::ColumnContract(format!("missing column '{name}'"))),
                (Some(_), Some(_)) => {
                    Err(Error::ColumnContract(format!("duplicate column '{name}'")))
                }
            }
        };

        Ok(Self {
            timestamp: position("timestamp")?,
            open: position("open")?,
            high: position("high")?,
            low: position("low")?,
            close: position("close")?,
            volume: position("volume")?,
        })
    }
}

/// Normalize positional rows into candles for one instrument.
///
/// Rows are mapped through `columns`; extra trailing fields are ignored.
/// Fails on the first row that is short, non-numeric, violates OHLC
/// ordering, or does not advance the timestamp. No partial series is ever
/// returned.
pub fn normalize<S: AsRef<str>>(
    rows: &[Vec<Value>],
    columns: &[S],
    meta: &SymbolInfo,
) -> Result<Vec<Candle>> {
    let index = ColumnIndex::resolve(columns)?;
    let expiry = meta.expiry_date()?;

    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if row.len() < columns.len() {
            return Err(Error::malformed(
                i,
                format!("expected {} fields, got {}", columns.len(), row.len()),
            ));
        }

        let candle = Candle {
            timestamp: parse_timestamp(i, &row[index.timestamp])?,
            open: parse_number(i, "open", &row[index.open])?,
            high: parse_number(i, "high", &row[index.high])?,
            low: parse_number(i, "low", &row[index.low])?,
            close: parse_number(i, "close", &row[index.close])?,
            volume: parse_volume(i, &row[index.volume])?,
            symbol: meta.symbol.clone(),
            expiry,
        };

        if candle.high < candle.open.max(candle.close) || candle.low > candle.open.min(candle.close)
        {
            return Err(Error::malformed(
                i,
                format!(
                    "inconsistent OHLC: open={} high={} low={} close={}",
                    candle.open, candle.high, candle.low, candle.close
                ),
            ));
        }

        if let Some(prev) = candles.last() {
            if candle.timestamp <= prev.timestamp {
                return Err(Error::malformed(
                    i,
                    format!(
                        "timestamp {} does not follow {}",
                        candle.timestamp, prev.timestamp
                    ),
                ));
            }
        }

        candles.push(candle);
    }

    Ok(candles)
}

/// Integers are epoch milliseconds; strings are RFC 3339.
fn parse_timestamp(row: usize, value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| Error::malformed(row, format!("timestamp {n} is not epoch millis"))),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| Error::malformed(row, format!("timestamp '{s}': {e}"))),
        other => Err(Error::malformed(row, format!("timestamp {other} is not a time"))),
    }
}

fn parse_number(row: usize, field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::malformed(row, format!("{field} {value} is not numeric")))
}

fn parse_volume(row: usize, value: &Value) -> Result<u64> {
    if let Some(v) = value.as_u64() {
        return Ok(v);
    }
    let v = parse_number(row, "volume", value)?;
    if v < 0.0 || v.fract() != 0.0 || v >= u64::MAX as f64 {
        return Err(Error::malformed(
            row,
            format!("volume {value} is not a non-negative whole number"),
        ));
    }
    Ok(v as u64)
}
