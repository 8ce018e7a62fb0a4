//! Coinstore endpoint and protocol constants

use std::time::Duration;

/// Base URLs
pub const REST_URL: &str = "https://api.coinstore.com/api";
pub const WSS_URL: &str = "wss://ws.coinstore.com/s/ws";

/// Websocket event types carried in the `T` field of inbound frames
pub const DIFF_EVENT_TYPE: &str = "depth";
pub const TRADE_EVENT_TYPE: &str = "trade";

/// Subscribe control-frame op code
pub const SUBSCRIBE_OP: &str = "SUB";
/// Keepalive reply op code
pub const PONG_OP: &str = "pong";

/// Depth levels requested on both the REST baseline and the diff channel
pub const DEPTH_LEVELS: u32 = 50;

/// Public REST endpoints
pub const ORDERBOOK_DEPTH_PATH: &str = "/v1/market/depth";
pub const LAST_TRADED_PRICE_PATH: &str = "/v1/market/trade";
pub const ALL_SYMBOL_PATH: &str = "/v1/ticker/price";
pub const SERVER_TIME_PATH: &str = "/v1/time";

/// The venue terminates idle connections that miss its heartbeat window.
/// Extra pong frames are accepted, so answering early is always safe.
pub const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Header carrying the API key on authenticated requests
pub const API_KEY_HEADER: &str = "X-COINSTORE-APIKEY";
