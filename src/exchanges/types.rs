//! Venue-agnostic market data types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-facing trading pair identifier in `BASE-QUOTE` form (e.g. `BTC-USDT`).
///
/// Immutable for the process lifetime; the registry maps it to the
/// exchange-native concatenated symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument(pub String);

impl Instrument {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Taker side of a trade
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// One order book level. Prices and amounts are exact decimals, never
/// binary floats, so downstream book arithmetic cannot accumulate
/// rounding drift.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

/// A single normalized trade
#[derive(Clone, Debug, PartialEq)]
pub struct TradeRecord {
    pub instrument: Instrument,
    pub trade_id: u64,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    /// Venue event time in epoch seconds (converted from milliseconds)
    pub event_time: f64,
}

/// The single representation handed to the downstream book-reconstruction
/// consumer. Every variant carries exactly one instrument and one update
/// marker.
///
/// The update marker (`update_id`) is the local receipt time in epoch
/// seconds. The venue supplies no monotonic sequence number on these
/// channels, so it orders snapshot against diff only as a causality hint;
/// it cannot detect gaps.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedMessage {
    Snapshot {
        instrument: Instrument,
        update_id: f64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    Diff {
        instrument: Instrument,
        update_id: f64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    Trade(TradeRecord),
}

impl NormalizedMessage {
    pub fn instrument(&self) -> &Instrument {
        match self {
            Self::Snapshot { instrument, .. } => instrument,
            Self::Diff { instrument, .. } => instrument,
            Self::Trade(t) => &t.instrument,
        }
    }

    /// Ordering token for cross-category reconciliation
    pub fn update_marker(&self) -> f64 {
        match self {
            Self::Snapshot { update_id, .. } => *update_id,
            Self::Diff { update_id, .. } => *update_id,
            Self::Trade(t) => t.event_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_instrument_display() {
        let inst = Instrument::new("BTC-USDT");
        assert_eq!(inst.to_string(), "BTC-USDT");
        assert_eq!(inst.as_str(), "BTC-USDT");
    }

    #[test]
    fn test_message_accessors() {
        let msg = NormalizedMessage::Trade(TradeRecord {
            instrument: Instrument::new("ETH-USDT"),
            trade_id: 42,
            side: Side::Buy,
            price: dec!(2000.5),
            amount: dec!(0.3),
            event_time: 1_700_000_000.123,
        });
        assert_eq!(msg.instrument().as_str(), "ETH-USDT");
        assert_eq!(msg.update_marker(), 1_700_000_000.123);
    }
}
