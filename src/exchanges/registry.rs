//! Instrument and channel registry
//!
//! Maps human-facing instruments to venue-native symbols and the numeric
//! channel ids the venue assigns per symbol. Populated once at startup
//! from exchange metadata, read-only thereafter; the maps are safe to
//! read while population is still running.

use dashmap::DashMap;
use serde_json::Value;
use tracing::{info, warn};

use super::errors::{CoinstoreError, CoinstoreResult};
use super::types::Instrument;

pub struct InstrumentRegistry {
    instrument_to_symbol: DashMap<Instrument, String>,
    symbol_to_instrument: DashMap<String, Instrument>,
    symbol_to_channel: DashMap<String, u64>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self {
            instrument_to_symbol: DashMap::new(),
            symbol_to_instrument: DashMap::new(),
            symbol_to_channel: DashMap::new(),
        }
    }

    /// One-shot population from the venue's symbol metadata response
    /// (`/v1/ticker/price`). Returns the number of instruments registered.
    ///
    /// Only USDT-quoted symbols are kept, matching the venue coverage the
    /// rest of the pipeline supports.
    pub fn populate_from_exchange_info(&self, info: &Value) -> CoinstoreResult<usize> {
        let code = info.get("code").and_then(Value::as_i64).unwrap_or(-1);
        if code != 0 {
            let message = info
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Err(CoinstoreError::MalformedResponse {
                details: format!("exchange info error code {}: {}", code, message),
            });
        }

        let entries = info.get("data").and_then(Value::as_array).ok_or_else(|| {
            CoinstoreError::MalformedResponse {
                details: "exchange info response missing data array".to_string(),
            }
        })?;

        let mut registered = 0;
        for entry in entries {
            let Some(symbol) = entry.get("symbol").and_then(Value::as_str) else {
                warn!("skipping exchange info entry without symbol: {}", entry);
                continue;
            };
            let Some(channel_id) = entry.get("id").and_then(Value::as_u64) else {
                warn!(symbol, "skipping exchange info entry without channel id");
                continue;
            };
            let Some(base) = symbol.strip_suffix("USDT") else {
                continue;
            };
            let instrument = Instrument::new(format!("{}-USDT", base.to_uppercase()));
            self.add_mapping(instrument, symbol, channel_id);
            registered += 1;
        }

        info!(registered, "instrument registry populated");
        Ok(registered)
    }

    /// Direct registration, used by alternate metadata loaders and tests
    pub fn add_mapping(&self, instrument: Instrument, venue_symbol: &str, channel_id: u64) {
        self.instrument_to_symbol
            .insert(instrument.clone(), venue_symbol.to_string());
        self.symbol_to_instrument
            .insert(venue_symbol.to_string(), instrument);
        self.symbol_to_channel
            .insert(venue_symbol.to_string(), channel_id);
    }

    /// Resolve an instrument to its venue-native symbol
    pub fn resolve(&self, instrument: &Instrument) -> CoinstoreResult<String> {
        self.instrument_to_symbol
            .get(instrument)
            .map(|s| s.clone())
            .ok_or_else(|| CoinstoreError::UnknownInstrument {
                instrument: instrument.to_string(),
            })
    }

    /// Reverse lookup used by the stream-path normalizers
    pub fn instrument_for_symbol(&self, venue_symbol: &str) -> CoinstoreResult<Instrument> {
        self.symbol_to_instrument
            .get(venue_symbol)
            .map(|i| i.clone())
            .ok_or_else(|| CoinstoreError::UnknownSymbol {
                symbol: venue_symbol.to_string(),
            })
    }

    /// Venue-assigned channel id for a symbol, required to build
    /// subscription channel names
    pub fn channel_id(&self, venue_symbol: &str) -> CoinstoreResult<u64> {
        self.symbol_to_channel
            .get(venue_symbol)
            .map(|id| *id)
            .ok_or_else(|| CoinstoreError::UnknownSymbol {
                symbol: venue_symbol.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.instrument_to_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrument_to_symbol.is_empty()
    }
}

impl Default for InstrumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
