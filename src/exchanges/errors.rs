//! Error types for the Coinstore market data pipeline

/// Custom result type for connector operations
pub type CoinstoreResult<T> = Result<T, CoinstoreError>;

/// Error taxonomy for the market data pipeline.
///
/// Single-frame failures (`UnknownSymbol`, `Parse`, `MalformedResponse` on
/// the stream path) are logged and the frame dropped; the connection stays
/// alive. Connection-level failures are fatal to the current connection
/// and surface to the external reconnect supervisor.
#[derive(Debug, thiserror::Error)]
pub enum CoinstoreError {
    #[error("unknown instrument: {instrument}")]
    UnknownInstrument { instrument: String },

    #[error("unknown venue symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("malformed response: {details}")]
    MalformedResponse { details: String },

    #[error("subscription failed: {details}")]
    Subscription { details: String },

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for CoinstoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for CoinstoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CoinstoreError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection {
            message: err.to_string(),
        }
    }
}

impl From<rust_decimal::Error> for CoinstoreError {
    fn from(err: rust_decimal::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
