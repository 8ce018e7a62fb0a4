//! Live market data feed demo
//!
//! Loads the venue symbol metadata, subscribes BTC-USDT depth and trade
//! channels, fetches one REST baseline, and prints normalized messages
//! until interrupted.

use anyhow::Result;
use coinstore_connector::exchanges::constants::{ALL_SYMBOL_PATH, REST_URL};
use coinstore_connector::{CoinstoreMarketData, Instrument, NormalizedMessage};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let connector = CoinstoreMarketData::new();

    let info: serde_json::Value = reqwest::get(format!("{}{}", REST_URL, ALL_SYMBOL_PATH))
        .await?
        .json()
        .await?;
    let registered = connector.load_symbols(&info)?;
    info!(registered, "symbol metadata loaded");

    let instrument = Instrument::new("BTC-USDT");

    let baseline = connector
        .baseline_fetcher()
        .fetch_snapshot(&instrument)
        .await?;
    if let NormalizedMessage::Snapshot { bids, asks, .. } = &baseline {
        info!(bids = bids.len(), asks = asks.len(), "baseline fetched");
    }

    let (mut session, mut queues) = connector.session(vec![instrument]);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(diff) = queues.diffs.recv() => {
                    info!("diff: {:?}", diff);
                }
                Some(trade) = queues.trades.recv() => {
                    info!("trade: {:?}", trade);
                }
                else => break,
            }
        }
    });

    // Reconnect supervision stays out here; each run rebuilds the full
    // subscription from the registry.
    loop {
        match session.run().await {
            Ok(()) => break,
            Err(e) => {
                error!("stream session ended: {}", e);
                warn!("reconnecting in 5s");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
    }

    Ok(())
}
