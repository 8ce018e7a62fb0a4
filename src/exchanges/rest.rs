//! REST baseline fetcher
//!
//! Per-instrument depth snapshots plus the small public endpoints the
//! operator tooling leans on (server time, last traded price). Errors
//! surface to the caller; retry scheduling lives outside this crate.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::auth::CoinstoreAuth;
use super::constants::{
    DEPTH_LEVELS, LAST_TRADED_PRICE_PATH, ORDERBOOK_DEPTH_PATH, REST_URL, SERVER_TIME_PATH,
};
use super::errors::{CoinstoreError, CoinstoreResult};
use super::registry::InstrumentRegistry;
use super::types::{Instrument, NormalizedMessage};
use crate::market_data::normalize_snapshot;

/// REST endpoint configuration
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub depth_levels: u32,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: REST_URL.to_string(),
            depth_levels: DEPTH_LEVELS,
        }
    }
}

pub struct BaselineFetcher {
    client: reqwest::Client,
    config: RestConfig,
    registry: Arc<InstrumentRegistry>,
    auth: Option<CoinstoreAuth>,
}

impl BaselineFetcher {
    pub fn new(registry: Arc<InstrumentRegistry>) -> Self {
        Self::with_config(registry, RestConfig::default())
    }

    pub fn with_config(registry: Arc<InstrumentRegistry>, config: RestConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            registry,
            auth: None,
        }
    }

    /// Attach a signer; the depth endpoint is public but the venue
    /// accepts (and rate-limits more generously) keyed requests.
    pub fn with_auth(mut self, auth: CoinstoreAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Fetch a full-depth snapshot for one instrument.
    ///
    /// The update marker is stamped with local receipt time; this
    /// endpoint carries no venue sequence number, so the marker is a
    /// causality hint only. Transport failures and malformed bodies are
    /// surfaced, never retried here.
    pub async fn fetch_snapshot(
        &self,
        instrument: &Instrument,
    ) -> CoinstoreResult<NormalizedMessage> {
        let symbol = self.registry.resolve(instrument)?;
        let url = self.depth_url(&symbol);
        debug!(%instrument, url, "fetching depth baseline");

        let body = self
            .get_json(&url, &[("depth", self.config.depth_levels.to_string())])
            .await?;
        normalize_snapshot(instrument, &body)
    }

    /// Venue clock in millisecond epoch, for diagnosing signing skew
    pub async fn server_time(&self) -> CoinstoreResult<u64> {
        let url = format!("{}{}", self.config.base_url, SERVER_TIME_PATH);
        let body = self.get_json(&url, &[]).await?;
        body.get("time")
            .and_then(Value::as_u64)
            .ok_or_else(|| CoinstoreError::MalformedResponse {
                details: "server time response missing time".to_string(),
            })
    }

    /// Price of the most recent trade for one instrument
    pub async fn last_traded_price(&self, instrument: &Instrument) -> CoinstoreResult<Decimal> {
        let symbol = self.registry.resolve(instrument)?;
        let url = format!(
            "{}{}/{}",
            self.config.base_url, LAST_TRADED_PRICE_PATH, symbol
        );
        let body = self.get_json(&url, &[]).await?;

        let price = body
            .get("data")
            .and_then(Value::as_array)
            .and_then(|trades| trades.first())
            .and_then(|trade| trade.get("price"))
            .and_then(Value::as_str)
            .ok_or_else(|| CoinstoreError::MalformedResponse {
                details: "trade response missing data[0].price".to_string(),
            })?;
        Ok(Decimal::from_str(price)?)
    }

    fn depth_url(&self, symbol: &str) -> String {
        format!("{}{}/{}", self.config.base_url, ORDERBOOK_DEPTH_PATH, symbol)
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> CoinstoreResult<Value> {
        let mut request = self.client.get(url).query(params);
        if let Some(auth) = &self.auth {
            let (header, key) = auth.auth_header();
            request = request.header(header, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoinstoreError::Transport {
                message: format!("{} returned HTTP {}", url, status),
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RestConfig::default();
        assert_eq!(config.base_url, "https://api.coinstore.com/api");
        assert_eq!(config.depth_levels, 50);
    }

    #[test]
    fn test_depth_url() {
        let registry = Arc::new(InstrumentRegistry::new());
        let fetcher = BaselineFetcher::new(registry);
        assert_eq!(
            fetcher.depth_url("BTCUSDT"),
            "https://api.coinstore.com/api/v1/market/depth/BTCUSDT"
        );
    }

    #[tokio::test]
    async fn test_fetch_snapshot_unknown_instrument() {
        let registry = Arc::new(InstrumentRegistry::new());
        let fetcher = BaselineFetcher::new(registry);

        let err = fetcher
            .fetch_snapshot(&Instrument::new("BTC-USDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoinstoreError::UnknownInstrument { .. }));
    }
}
