//! Coinstore frame normalizers
//!
//! Each function converts one venue JSON shape into exactly one kind of
//! [`NormalizedMessage`]. A frame is either fully parsed or rejected with
//! an error; a partially filled message is never produced.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::exchanges::errors::{CoinstoreError, CoinstoreResult};
use crate::exchanges::registry::InstrumentRegistry;
use crate::exchanges::types::{Instrument, NormalizedMessage, PriceLevel, Side, TradeRecord};

/// Local receipt time in epoch seconds, used as the update marker for
/// snapshot and diff records (the venue supplies no sequence number).
pub fn receipt_time() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Normalize a REST depth response (`data.b` / `data.a`) into a Snapshot.
///
/// The instrument is known to the caller (it made the request), so no
/// registry lookup is needed on this path.
pub fn normalize_snapshot(
    instrument: &Instrument,
    response: &Value,
) -> CoinstoreResult<NormalizedMessage> {
    let data = response
        .get("data")
        .ok_or_else(|| CoinstoreError::MalformedResponse {
            details: "depth response missing data".to_string(),
        })?;
    let bids = parse_levels(data, "b")?;
    let asks = parse_levels(data, "a")?;

    Ok(NormalizedMessage::Snapshot {
        instrument: instrument.clone(),
        update_id: receipt_time(),
        bids,
        asks,
    })
}

/// Stream-path normalizers. Diff and trade frames carry the venue symbol,
/// so these need the registry for the reverse lookup.
pub struct CoinstoreNormalizer {
    registry: Arc<InstrumentRegistry>,
}

impl CoinstoreNormalizer {
    pub fn new(registry: Arc<InstrumentRegistry>) -> Self {
        Self { registry }
    }

    /// Normalize an incremental depth frame (`b` / `a` at the top level)
    pub fn normalize_diff(&self, frame: &Value) -> CoinstoreResult<NormalizedMessage> {
        let symbol = frame
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| CoinstoreError::Parse("diff frame missing symbol".to_string()))?;
        let instrument = self.registry.instrument_for_symbol(symbol)?;

        let bids = parse_levels(frame, "b")?;
        let asks = parse_levels(frame, "a")?;

        Ok(NormalizedMessage::Diff {
            instrument,
            update_id: receipt_time(),
            bids,
            asks,
        })
    }

    /// Normalize a trade frame.
    ///
    /// The venue sends a `data` batch array, and may additionally carry a
    /// single incremental trade at the top level of the same frame; the
    /// two shapes are not mutually exclusive, so both are emitted, batch
    /// entries first in arrival order.
    pub fn normalize_trades(&self, frame: &Value) -> CoinstoreResult<Vec<NormalizedMessage>> {
        let mut records = Vec::new();

        if let Some(batch) = frame.get("data").and_then(Value::as_array) {
            for entry in batch {
                records.push(NormalizedMessage::Trade(self.trade_record(entry)?));
            }
        }

        if frame.get("tradeId").is_some() {
            records.push(NormalizedMessage::Trade(self.trade_record(frame)?));
        }

        if records.is_empty() {
            return Err(CoinstoreError::Parse(
                "trade frame carried no trade payload".to_string(),
            ));
        }
        Ok(records)
    }

    fn trade_record(&self, payload: &Value) -> CoinstoreResult<TradeRecord> {
        let trade_id = payload
            .get("tradeId")
            .and_then(Value::as_u64)
            .ok_or_else(|| CoinstoreError::Parse("trade payload missing tradeId".to_string()))?;
        let symbol = payload
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| CoinstoreError::Parse("trade payload missing symbol".to_string()))?;
        let instrument = self.registry.instrument_for_symbol(symbol)?;

        let taker_side = payload
            .get("takerSide")
            .and_then(Value::as_str)
            .ok_or_else(|| CoinstoreError::Parse("trade payload missing takerSide".to_string()))?;
        let side = if taker_side == "BUY" {
            Side::Buy
        } else {
            Side::Sell
        };

        let price = decimal_field(payload, "price")?;
        let amount = decimal_field(payload, "volume")?;

        let time_ms = payload
            .get("time")
            .and_then(Value::as_f64)
            .ok_or_else(|| CoinstoreError::Parse("trade payload missing time".to_string()))?;

        Ok(TradeRecord {
            instrument,
            trade_id,
            side,
            price,
            amount,
            event_time: time_ms / 1000.0,
        })
    }
}

/// Parse a bid/ask array of `[price, amount]` rows
fn parse_levels(container: &Value, field: &str) -> CoinstoreResult<Vec<PriceLevel>> {
    let rows = container
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| CoinstoreError::MalformedResponse {
            details: format!("missing {} level array", field),
        })?;

    rows.iter()
        .map(|row| {
            let pair = row
                .as_array()
                .filter(|a| a.len() >= 2)
                .ok_or_else(|| CoinstoreError::Parse(format!("bad level row: {}", row)))?;
            Ok(PriceLevel::new(
                decimal_from_value(&pair[0])?,
                decimal_from_value(&pair[1])?,
            ))
        })
        .collect()
}

fn decimal_field(payload: &Value, field: &str) -> CoinstoreResult<Decimal> {
    let value = payload
        .get(field)
        .ok_or_else(|| CoinstoreError::Parse(format!("missing {} field", field)))?;
    decimal_from_value(value)
}

/// The venue is inconsistent about quoting numbers; accept both. Numeric
/// values go through their textual JSON form so no f64 round-trip can
/// perturb the digits.
fn decimal_from_value(value: &Value) -> CoinstoreResult<Decimal> {
    match value {
        Value::String(s) => Ok(Decimal::from_str(s)?),
        Value::Number(n) => Ok(Decimal::from_str(&n.to_string())?),
        other => Err(CoinstoreError::Parse(format!(
            "expected decimal, got {}",
            other
        ))),
    }
}
