//! WebSocket streaming for Coinstore market data
//!
//! One socket multiplexes every subscribed instrument. The venue expects
//! `{"op":"SUB",...}` control frames for subscription and terminates
//! connections that miss its heartbeat window, so unclassifiable inbound
//! frames are always answered with a pong.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::constants::{
    DEPTH_LEVELS, DIFF_EVENT_TYPE, PONG_OP, SUBSCRIBE_OP, TRADE_EVENT_TYPE, WSS_URL,
    WS_HEARTBEAT_INTERVAL,
};
use super::errors::{CoinstoreError, CoinstoreResult};
use super::registry::InstrumentRegistry;
use super::types::Instrument;
use crate::market_data::{MarketDataQueues, MarketDataRouter};

/// Write-side seam between the router and the transport. Lets the
/// subscription and keepalive logic run against any frame sink.
#[async_trait]
pub trait WsSink {
    async fn send_json(&mut self, payload: Value) -> CoinstoreResult<()>;
}

/// Stream connection configuration
#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub ws_url: String,
    pub heartbeat_interval: Duration,
    pub depth_levels: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: WSS_URL.to_string(),
            heartbeat_interval: WS_HEARTBEAT_INTERVAL,
            depth_levels: DEPTH_LEVELS,
        }
    }
}

/// Thin wrapper over the tungstenite stream exposing JSON frames
pub struct CoinstoreStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl CoinstoreStream {
    pub async fn connect(url: &str) -> CoinstoreResult<Self> {
        let parsed = url::Url::parse(url).map_err(|e| CoinstoreError::Connection {
            message: format!("invalid websocket url: {}", e),
        })?;
        let (inner, _) = connect_async(parsed).await?;
        info!(url, "websocket connected");
        Ok(Self { inner })
    }

    /// Next JSON frame from the venue. Protocol-level pings are answered
    /// inline, non-text frames are skipped, a close frame or stream end
    /// yields `None`. Frames that are not valid JSON surface as `Parse`
    /// errors so the caller can drop them without tearing the connection.
    pub async fn next_frame(&mut self) -> Option<CoinstoreResult<Value>> {
        while let Some(message) = self.inner.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(Into::into))
                }
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.inner.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!("websocket closed by venue: {:?}", frame);
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    pub async fn close(&mut self) -> CoinstoreResult<()> {
        self.inner.close(None).await?;
        Ok(())
    }
}

#[async_trait]
impl WsSink for CoinstoreStream {
    async fn send_json(&mut self, payload: Value) -> CoinstoreResult<()> {
        self.inner.send(Message::Text(payload.to_string())).await?;
        Ok(())
    }
}

/// Subscribe the depth and trade channels for every instrument in one
/// control frame.
///
/// Idempotent: a reconnect calls this again and re-subscribes the full
/// set. If any instrument fails to resolve nothing is sent at all, since
/// a stream silently missing instruments is worse than no stream.
pub async fn subscribe<S: WsSink + Send>(
    sink: &mut S,
    registry: &InstrumentRegistry,
    instruments: &[Instrument],
    depth_levels: u32,
) -> CoinstoreResult<()> {
    let mut channels = Vec::with_capacity(instruments.len() * 2);
    for instrument in instruments {
        let channel_id = registry
            .resolve(instrument)
            .and_then(|symbol| registry.channel_id(&symbol))
            .map_err(|e| CoinstoreError::Subscription {
                details: format!("cannot subscribe {}: {}", instrument, e),
            })?;
        channels.push(format!("{}@{}@{}", channel_id, DIFF_EVENT_TYPE, depth_levels));
        channels.push(format!("{}@{}", channel_id, TRADE_EVENT_TYPE));
    }

    let payload = json!({
        "op": SUBSCRIBE_OP,
        "channel": channels,
        "id": 1,
    });
    sink.send_json(payload).await?;
    info!(
        instruments = instruments.len(),
        "subscribed to depth and trade channels"
    );
    Ok(())
}

/// Millisecond epoch as a float, the shape the venue expects in pong frames
pub fn epoch_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Answer the venue's liveness check. Unconditional; the venue accepts
/// surplus pong frames and its heartbeat window has no grace period.
pub async fn answer_keepalive<S: WsSink + Send>(sink: &mut S) -> CoinstoreResult<()> {
    sink.send_json(json!({"op": PONG_OP, "epochMillis": epoch_millis()}))
        .await
}

/// One stream connection worth of market data synchronization: a single
/// reader loop owning the socket, driving the router.
///
/// `run` returns when the connection dies; reconnect policy belongs to
/// the caller, which simply calls `run` again to rebuild the full
/// subscription from the registry.
pub struct MarketDataSession {
    config: StreamConfig,
    registry: Arc<InstrumentRegistry>,
    instruments: Vec<Instrument>,
    router: MarketDataRouter,
}

impl MarketDataSession {
    pub fn new(
        config: StreamConfig,
        registry: Arc<InstrumentRegistry>,
        instruments: Vec<Instrument>,
    ) -> (Self, MarketDataQueues) {
        let (router, queues) = MarketDataRouter::new(registry.clone());
        let session = Self {
            config,
            registry,
            instruments,
            router,
        };
        (session, queues)
    }

    /// Connect, subscribe, then receive and route frames until the
    /// connection fails. Single-frame parse failures are dropped here;
    /// everything else that errors is fatal to this connection.
    pub async fn run(&mut self) -> CoinstoreResult<()> {
        let mut stream = CoinstoreStream::connect(&self.config.ws_url).await?;
        subscribe(
            &mut stream,
            &self.registry,
            &self.instruments,
            self.config.depth_levels,
        )
        .await?;

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                frame = stream.next_frame() => match frame {
                    Some(Ok(frame)) => {
                        self.router.route_frame(&frame, &mut stream).await?;
                    }
                    Some(Err(CoinstoreError::Parse(e))) => {
                        warn!("dropping non-JSON frame: {}", e);
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(CoinstoreError::Connection {
                            message: "websocket stream ended".to_string(),
                        })
                    }
                },
                _ = heartbeat.tick() => {
                    debug!("heartbeat interval elapsed, sending pong");
                    answer_keepalive(&mut stream).await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

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

    fn registry_with(pairs: &[(&str, &str, u64)]) -> InstrumentRegistry {
        let registry = InstrumentRegistry::new();
        for (instrument, symbol, id) in pairs {
            registry.add_mapping(Instrument::new(*instrument), symbol, *id);
        }
        registry
    }

    #[tokio::test]
    async fn test_subscribe_sends_single_frame_with_all_channels() {
        let registry = registry_with(&[("BTC-USDT", "BTCUSDT", 28), ("ETH-USDT", "ETHUSDT", 27)]);
        let instruments = vec![Instrument::new("BTC-USDT"), Instrument::new("ETH-USDT")];
        let mut sink = RecordingSink { sent: Vec::new() };

        subscribe(&mut sink, &registry, &instruments, 50).await.unwrap();

        assert_eq!(sink.sent.len(), 1);
        let frame = &sink.sent[0];
        assert_eq!(frame["op"], "SUB");
        assert_eq!(frame["id"], 1);

        let channels = frame["channel"].as_array().unwrap();
        assert_eq!(channels.len(), 2 * instruments.len());
        assert_eq!(channels[0], "28@depth@50");
        assert_eq!(channels[1], "28@trade");
        assert_eq!(channels[2], "27@depth@50");
        assert_eq!(channels[3], "27@trade");
    }

    #[tokio::test]
    async fn test_subscribe_aborts_whole_call_on_unknown_instrument() {
        let registry = registry_with(&[("BTC-USDT", "BTCUSDT", 28)]);
        let instruments = vec![Instrument::new("BTC-USDT"), Instrument::new("DOGE-USDT")];
        let mut sink = RecordingSink { sent: Vec::new() };

        let err = subscribe(&mut sink, &registry, &instruments, 50)
            .await
            .unwrap_err();

        assert!(matches!(err, CoinstoreError::Subscription { .. }));
        // a partial subscription set is worse than none
        assert!(sink.sent.is_empty());
    }

    #[tokio::test]
    async fn test_keepalive_reply_shape() {
        let mut sink = RecordingSink { sent: Vec::new() };
        answer_keepalive(&mut sink).await.unwrap();

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0]["op"], "pong");
        let millis = sink.sent[0]["epochMillis"].as_f64().unwrap();
        assert!(millis > 1.6e12);
    }

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.ws_url, WSS_URL);
        assert_eq!(config.depth_levels, 50);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    }
}
