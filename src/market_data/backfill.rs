// =============================================================================
// Backfill — one-shot bulk history load per tracked pair
// =============================================================================

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::exchange::ExchangeClient;
use crate::market_data::store::CandleStore;
use crate::types::SeriesKey;

/// Fetch history for every tracked pair concurrently and seed the store.
///
/// Each pair is isolated: a failed fetch (network error, bad status,
/// malformed payload) is logged and leaves that series short until live data
/// arrives; sibling loads are unaffected. The caller spawns this in the
/// background, so service readiness never waits on it.
pub async fn run(
    client: Arc<ExchangeClient>,
    store: Arc<CandleStore>,
    keys: Vec<SeriesKey>,
    limit: usize,
) {
    info!(pairs = keys.len(), "starting background data backfill");

    let tasks = keys.into_iter().map(|key| {
        let client = client.clone();
        let store = store.clone();
        async move { backfill_series(&client, &store, key, limit).await }
    });
    join_all(tasks).await;

    info!("initial backfill complete");
}

async fn backfill_series(
    client: &ExchangeClient,
    store: &CandleStore,
    key: SeriesKey,
    limit: usize,
) {
    match client.get_klines(&key.symbol, &key.interval, limit).await {
        Ok(candles) => {
            let count = candles.len();
            store.extend(&key, candles);
            info!(key = %key, count, "series backfilled");
        }
        Err(e) => {
            warn!(key = %key, error = %e, "backfill failed; series stays short until live data arrives");
        }
    }
}
