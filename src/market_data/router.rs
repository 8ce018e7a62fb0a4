//! Inbound frame classification and dispatch
//!
//! One router instance serves one stream connection. Every frame is
//! classified exactly once; trade and diff frames go through the
//! normalizers onto their category queues, anything else is answered
//! with a keepalive. A single bad frame never terminates the connection:
//! normalizer failures are logged and the frame dropped.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::normalizers::CoinstoreNormalizer;
use super::MarketDataQueues;
use crate::exchanges::constants::{DIFF_EVENT_TYPE, TRADE_EVENT_TYPE};
use crate::exchanges::errors::CoinstoreResult;
use crate::exchanges::registry::InstrumentRegistry;
use crate::exchanges::types::NormalizedMessage;
use crate::exchanges::websocket::{answer_keepalive, WsSink};

/// Classification outcome for one inbound frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameClass {
    Trade,
    Diff,
    Unknown,
}

/// Classify a frame by its `T` tag, in priority order. A top-level
/// `tradeId` marks an incremental trade even without the tag.
pub fn classify(frame: &Value) -> FrameClass {
    let tag = frame.get("T").and_then(Value::as_str);
    if tag == Some(TRADE_EVENT_TYPE) || frame.get("tradeId").is_some() {
        FrameClass::Trade
    } else if tag == Some(DIFF_EVENT_TYPE) {
        FrameClass::Diff
    } else {
        FrameClass::Unknown
    }
}

pub struct MarketDataRouter {
    normalizer: CoinstoreNormalizer,
    trade_tx: mpsc::UnboundedSender<NormalizedMessage>,
    diff_tx: mpsc::UnboundedSender<NormalizedMessage>,
}

impl MarketDataRouter {
    /// Build a router plus the category queues its output lands on
    pub fn new(registry: Arc<InstrumentRegistry>) -> (Self, MarketDataQueues) {
        let (trade_tx, trades) = mpsc::unbounded_channel();
        let (diff_tx, diffs) = mpsc::unbounded_channel();
        let router = Self {
            normalizer: CoinstoreNormalizer::new(registry),
            trade_tx,
            diff_tx,
        };
        (router, MarketDataQueues { trades, diffs })
    }

    /// Route one inbound frame. Only sink failures propagate; per-frame
    /// parse and resolution failures are recovered locally.
    pub async fn route_frame<S: WsSink + Send>(
        &self,
        frame: &Value,
        sink: &mut S,
    ) -> CoinstoreResult<()> {
        match classify(frame) {
            FrameClass::Trade => match self.normalizer.normalize_trades(frame) {
                Ok(records) => {
                    for record in records {
                        if self.trade_tx.send(record).is_err() {
                            debug!("trade queue consumer gone, dropping record");
                        }
                    }
                }
                Err(e) => warn!("dropping unparseable trade frame: {}", e),
            },
            FrameClass::Diff => match self.normalizer.normalize_diff(frame) {
                Ok(record) => {
                    if self.diff_tx.send(record).is_err() {
                        debug!("diff queue consumer gone, dropping record");
                    }
                }
                Err(e) => warn!("dropping unparseable diff frame: {}", e),
            },
            // The venue's liveness check rides on otherwise-unclassifiable
            // frames; always answer, even under backpressure.
            FrameClass::Unknown => answer_keepalive(sink).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::errors::CoinstoreResult;
    use crate::exchanges::types::{Instrument, NormalizedMessage};
    use async_trait::async_trait;
    use serde_json::json;

    struct RecordingSink {
        sent: Vec<Value>,
    }

    #[async_trait]
    impl WsSink for RecordingSink {
        async fn send_json(&mut self, payload: Value) -> CoinstoreResult<()> {
            self.sent.push(payload);
            Ok(())
        }
    }

    fn setup() -> (MarketDataRouter, MarketDataQueues, RecordingSink) {
        let registry = InstrumentRegistry::new();
        registry.add_mapping(Instrument::new("BTC-USDT"), "BTCUSDT", 28);
        let (router, queues) = MarketDataRouter::new(Arc::new(registry));
        (router, queues, RecordingSink { sent: Vec::new() })
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(classify(&json!({"T": "trade", "data": []})), FrameClass::Trade);
        assert_eq!(classify(&json!({"T": "depth", "b": [], "a": []})), FrameClass::Diff);
        assert_eq!(classify(&json!({"op": "welcome"})), FrameClass::Unknown);
    }

    #[test]
    fn test_top_level_trade_id_classifies_as_trade() {
        // incremental trade edge case: no T tag, no data array
        let frame = json!({"tradeId": 7, "symbol": "BTCUSDT"});
        assert_eq!(classify(&frame), FrameClass::Trade);
    }

    #[tokio::test]
    async fn test_unknown_frame_answered_with_pong() {
        let (router, _queues, mut sink) = setup();
        let frame = json!({"op": "connected"});

        router.route_frame(&frame, &mut sink).await.unwrap();

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0]["op"], "pong");
        assert!(sink.sent[0]["epochMillis"].is_number());
    }

    #[tokio::test]
    async fn test_diff_frame_enqueued() {
        let (router, mut queues, mut sink) = setup();
        let frame = json!({"T": "depth", "symbol": "BTCUSDT", "b": [[45000, 1]], "a": [[45500, 1]]});

        router.route_frame(&frame, &mut sink).await.unwrap();

        assert!(sink.sent.is_empty());
        let msg = queues.diffs.try_recv().unwrap();
        assert!(matches!(msg, NormalizedMessage::Diff { .. }));
        assert!(queues.diffs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unresolvable_diff_dropped() {
        let (router, mut queues, mut sink) = setup();
        let frame = json!({"T": "depth", "symbol": "DOGEUSDT", "b": [], "a": []});

        router.route_frame(&frame, &mut sink).await.unwrap();

        assert!(queues.diffs.try_recv().is_err());
        // a dropped frame is not an unknown frame, no pong
        assert!(sink.sent.is_empty());
    }

    #[tokio::test]
    async fn test_batch_trades_arrive_in_order() {
        let (router, mut queues, mut sink) = setup();
        let frame = json!({
            "T": "trade",
            "data": [
                {"tradeId": 1, "symbol": "BTCUSDT", "takerSide": "BUY", "price": "1", "volume": "1", "time": 1000u64},
                {"tradeId": 2, "symbol": "BTCUSDT", "takerSide": "SELL", "price": "2", "volume": "2", "time": 2000u64},
            ]
        });

        router.route_frame(&frame, &mut sink).await.unwrap();

        for expected in [1u64, 2] {
            match queues.trades.try_recv().unwrap() {
                NormalizedMessage::Trade(t) => assert_eq!(t.trade_id, expected),
                other => panic!("expected trade, got {:?}", other),
            }
        }
        assert!(queues.trades.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_incremental_trade_not_dropped_as_unknown() {
        let (router, mut queues, mut sink) = setup();
        let frame = json!({
            "tradeId": 9, "symbol": "BTCUSDT", "takerSide": "BUY",
            "price": "45000", "volume": "0.1", "time": 1700000000000u64
        });

        router.route_frame(&frame, &mut sink).await.unwrap();

        assert!(sink.sent.is_empty());
        match queues.trades.try_recv().unwrap() {
            NormalizedMessage::Trade(t) => assert_eq!(t.trade_id, 9),
            other => panic!("expected trade, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_trade_frame_recovered() {
        let (router, mut queues, mut sink) = setup();
        // classified as trade but missing every required field
        let frame = json!({"T": "trade", "data": [{"bogus": true}]});

        let result = router.route_frame(&frame, &mut sink).await;

        assert!(result.is_ok());
        assert!(queues.trades.try_recv().is_err());
    }
}
