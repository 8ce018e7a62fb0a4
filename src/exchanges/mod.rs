//! Coinstore exchange connectivity modules

pub mod auth;
pub mod constants;
pub mod errors;
pub mod registry;
pub mod rest;
pub mod types;
pub mod websocket;

pub use auth::CoinstoreAuth;
pub use errors::{CoinstoreError, CoinstoreResult};
pub use registry::InstrumentRegistry;
pub use rest::{BaselineFetcher, RestConfig};
pub use types::{Instrument, NormalizedMessage, PriceLevel, Side, TradeRecord};
pub use websocket::{
    answer_keepalive, subscribe, CoinstoreStream, MarketDataSession, StreamConfig, WsSink,
};
