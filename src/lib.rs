//! Coinstore Market Data Connector
//!
//! Real-time market data synchronization pipeline for the Coinstore
//! exchange: one durable websocket multiplexing incremental depth and
//! trade channels for a set of instruments, REST depth baselines, and
//! normalization of every inbound frame into a venue-agnostic
//! representation consumed by a downstream book builder.

pub mod exchanges;
pub mod market_data;

// Re-export main types for easy access
pub use exchanges::{
    BaselineFetcher, CoinstoreAuth, CoinstoreError, CoinstoreResult, CoinstoreStream, Instrument,
    InstrumentRegistry, MarketDataSession, NormalizedMessage, PriceLevel, RestConfig, Side,
    StreamConfig, TradeRecord, WsSink,
};
pub use market_data::{classify, FrameClass, MarketDataQueues, MarketDataRouter};

use std::sync::Arc;

/// Main entry point bundling the registry, the baseline fetcher, and
/// stream session construction for one exchange connection.
pub struct CoinstoreMarketData {
    registry: Arc<InstrumentRegistry>,
    stream_config: StreamConfig,
    rest_config: RestConfig,
}

impl CoinstoreMarketData {
    pub fn new() -> Self {
        Self::with_configs(StreamConfig::default(), RestConfig::default())
    }

    pub fn with_configs(stream_config: StreamConfig, rest_config: RestConfig) -> Self {
        Self {
            registry: Arc::new(InstrumentRegistry::new()),
            stream_config,
            rest_config,
        }
    }

    /// One-shot registry population from the venue's symbol metadata.
    /// Must complete before sessions or fetchers are built so lookups
    /// never race the load.
    pub fn load_symbols(&self, exchange_info: &serde_json::Value) -> CoinstoreResult<usize> {
        self.registry.populate_from_exchange_info(exchange_info)
    }

    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        &self.registry
    }

    /// REST fetcher for per-instrument depth baselines
    pub fn baseline_fetcher(&self) -> BaselineFetcher {
        BaselineFetcher::with_config(self.registry.clone(), self.rest_config.clone())
    }

    /// Build a stream session for the given instruments along with the
    /// queues its normalized output lands on
    pub fn session(&self, instruments: Vec<Instrument>) -> (MarketDataSession, MarketDataQueues) {
        MarketDataSession::new(self.stream_config.clone(), self.registry.clone(), instruments)
    }
}

impl Default for CoinstoreMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connector_setup() {
        let connector = CoinstoreMarketData::new();
        let info = json!({
            "code": 0,
            "data": [{"symbol": "BTCUSDT", "id": 28}]
        });

        assert_eq!(connector.load_symbols(&info).unwrap(), 1);
        assert_eq!(
            connector
                .registry()
                .resolve(&Instrument::new("BTC-USDT"))
                .unwrap(),
            "BTCUSDT"
        );

        let (_session, queues) = connector.session(vec![Instrument::new("BTC-USDT")]);
        drop(queues);
    }
}
