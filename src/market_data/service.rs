// =============================================================================
// MarketDataService — lifecycle controller and read API
// =============================================================================
//
// An explicitly constructed service instance: the store, the shared REST
// client, and the stream ingestor all hang off this struct, so tests run
// isolated instances and nothing is process-global.
//
// start() spawns backfill and the ingestor and returns immediately; warm-up
// continues in the background so external readiness checks never wait on it.
// stop() cancels the ingestor and awaits a bounded wind-down.
// =============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;
use crate::exchange::ExchangeClient;
use crate::market_data::backfill;
use crate::market_data::store::CandleStore;
use crate::market_data::stream::{self, StreamState};
use crate::types::{Candle, SeriesKey};

/// Bounded wait for the stream ingestor to wind down on stop().
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MarketDataService {
    settings: Settings,
    store: Arc<CandleStore>,
    stream_state: Arc<RwLock<StreamState>>,
    runtime: Mutex<Option<StreamRuntime>>,
    started_at: Instant,
}

/// Handles owned only while the service is running.
struct StreamRuntime {
    client: Arc<ExchangeClient>,
    cancel: CancellationToken,
    ingest_task: JoinHandle<()>,
}

impl MarketDataService {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(CandleStore::new(
            &settings.symbols,
            &settings.intervals,
            settings.history_limit,
        ));

        Self {
            settings,
            store,
            stream_state: Arc::new(RwLock::new(StreamState::Disconnected)),
            runtime: Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    /// Allocate the shared network client and spawn the backfill tasks and
    /// the stream ingestor. Returns immediately; a second start while running
    /// is a no-op.
    pub fn start(&self) {
        let mut runtime = self.runtime.lock();
        if runtime.is_some() {
            warn!("market data service already running; start ignored");
            return;
        }

        info!(
            symbols = ?self.settings.symbols,
            intervals = ?self.settings.intervals,
            history_limit = self.settings.history_limit,
            "starting market data engine"
        );

        let client = Arc::new(ExchangeClient::new(self.settings.rest_base.clone()));

        // Backfill is fire-and-forget so health checks pass during warm-up.
        tokio::spawn(backfill::run(
            client.clone(),
            self.store.clone(),
            self.tracked_keys(),
            self.settings.history_limit,
        ));

        let cancel = CancellationToken::new();
        let url = stream::combined_stream_url(
            &self.settings.stream_base,
            &self.settings.symbols,
            &self.settings.intervals,
        );
        let ingest_task = tokio::spawn(stream::run(
            url,
            self.store.clone(),
            self.stream_state.clone(),
            self.settings.reconnect_backoff,
            cancel.clone(),
        ));

        *runtime = Some(StreamRuntime {
            client,
            cancel,
            ingest_task,
        });
    }

    /// Signal the ingestor to stop, await its bounded wind-down (connection
    /// close included), and release the network client. Safe to call before
    /// start() and safe to call twice.
    pub async fn stop(&self) {
        let runtime = self.runtime.lock().take();
        let Some(StreamRuntime {
            client,
            cancel,
            ingest_task,
        }) = runtime
        else {
            warn!("market data service not running; stop ignored");
            return;
        };

        cancel.cancel();
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, ingest_task).await {
            Ok(Ok(())) => info!("market data engine stopped"),
            Ok(Err(e)) => warn!(error = %e, "stream ingestor task failed during shutdown"),
            Err(_) => warn!("stream ingestor did not stop within the shutdown timeout"),
        }

        // In-flight backfill tasks hold their own client clones and may be
        // abandoned; the pool closes once the last clone drops.
        drop(client);
    }

    // ── Read API ────────────────────────────────────────────────────────

    /// Snapshot of the last `limit` candles for a pair, oldest-first.
    /// Unknown pairs return an empty vector, never an error; callers read a
    /// short result as "no data yet".
    pub fn candles(&self, symbol: &str, interval: &str, limit: usize) -> Vec<Candle> {
        self.store.snapshot(&SeriesKey::new(symbol, interval), limit)
    }

    /// Close prices of the last `limit` candles for a pair, oldest-first.
    pub fn closes(&self, symbol: &str, interval: &str, limit: usize) -> Vec<f64> {
        self.store.closes(&SeriesKey::new(symbol, interval), limit)
    }

    // ── Status ──────────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.runtime.lock().is_some()
    }

    /// Operational snapshot consumed by the admin status endpoint.
    pub fn status(&self) -> ServiceStatus {
        let series = self
            .tracked_keys()
            .into_iter()
            .map(|key| SeriesFill {
                len: self.store.series_len(&key),
                capacity: self.settings.history_limit,
                key: key.to_string(),
            })
            .collect();

        ServiceStatus {
            running: self.is_running(),
            stream_state: *self.stream_state.read(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            series,
        }
    }

    fn tracked_keys(&self) -> Vec<SeriesKey> {
        let mut keys =
            Vec::with_capacity(self.settings.symbols.len() * self.settings.intervals.len());
        for symbol in &self.settings.symbols {
            for interval in &self.settings.intervals {
                keys.push(SeriesKey::new(symbol.clone(), interval.clone()));
            }
        }
        keys
    }
}

/// Operational status of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub stream_state: StreamState,
    pub uptime_secs: u64,
    pub series: Vec<SeriesFill>,
}

/// Fill level of one tracked series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesFill {
    pub key: String,
    pub len: usize,
    pub capacity: usize,
}
