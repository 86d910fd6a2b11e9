// =============================================================================
// Stream ingestor — multiplexed kline WebSocket with auto-reconnect
// =============================================================================
//
// One connection carries the kline channels for every tracked
// (symbol, interval) pair. The loop runs Disconnected -> Connecting ->
// Connected -> Disconnected indefinitely with a fixed backoff between
// attempts; only cancellation ends it, and cancellation closes the active
// socket before the task returns.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exchange::client::parse_str_f64;
use crate::market_data::store::CandleStore;
use crate::types::{Candle, SeriesKey};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of the live stream, published for the status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
}

/// Build the combined-stream URL covering every tracked (symbol, interval)
/// pair. Channel format: `<symbol>@kline_<interval>`, lowercase.
pub fn combined_stream_url(base: &str, symbols: &[String], intervals: &[String]) -> String {
    let mut channels = Vec::with_capacity(symbols.len() * intervals.len());
    for symbol in symbols {
        let lower = symbol.to_lowercase();
        for interval in intervals {
            channels.push(format!("{lower}@kline_{interval}"));
        }
    }
    format!("{base}/stream?streams={}", channels.join("/"))
}

/// Consume the combined kline stream until `cancel` fires.
///
/// Connection failures never terminate the loop; each disconnect is followed
/// by exactly one `backoff` wait before the next attempt. The token is
/// observed at every suspension point (connect, read, backoff sleep).
pub async fn run(
    url: String,
    store: Arc<CandleStore>,
    state: Arc<RwLock<StreamState>>,
    backoff: Duration,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        *state.write() = StreamState::Connecting;
        let connect = tokio::select! {
            _ = cancel.cancelled() => break,
            res = connect_async(&url) => res,
        };

        match connect {
            Ok((ws, _response)) => {
                *state.write() = StreamState::Connected;
                info!("kline stream connected");
                consume(ws, &store, &cancel).await;
                *state.write() = StreamState::Disconnected;
                if cancel.is_cancelled() {
                    break;
                }
                warn!(backoff_secs = backoff.as_secs(), "kline stream disconnected; reconnecting");
            }
            Err(e) => {
                *state.write() = StreamState::Disconnected;
                warn!(error = %e, backoff_secs = backoff.as_secs(), "kline stream connect failed; retrying");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
    }

    *state.write() = StreamState::Disconnected;
    info!("kline stream stopped");
}

/// Read messages from an established connection until it ends, errors, or
/// shutdown is requested. On shutdown the socket is closed before returning.
async fn consume(mut ws: WsStream, store: &CandleStore, cancel: &CancellationToken) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = ws.close(None).await {
                    debug!(error = %e, "error closing kline stream");
                }
                return;
            }
            msg = ws.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => match parse_kline_event(&text) {
                Ok(Some((key, candle))) => {
                    debug!(key = %key, close = candle.close, "candle update");
                    store.upsert(&key, candle);
                }
                // Not a candle event; nothing to apply.
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to parse stream message"),
            },
            // Ping/Pong/Binary/Close frames; tungstenite answers pings itself.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "kline stream read error");
                return;
            }
            None => {
                warn!("kline stream ended");
                return;
            }
        }
    }
}

/// Parse one stream message into a candle update.
///
/// Combined-stream messages wrap the payload in `{ "stream": ..., "data": ... }`;
/// bare payloads are accepted too. Returns `Ok(None)` for well-formed
/// messages that are not kline events. The `k.x` period-closed flag is
/// accepted but unused: append-vs-replace is decided from the open time
/// alone.
fn parse_kline_event(text: &str) -> Result<Option<(SeriesKey, Candle)>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse stream JSON")?;

    let data = if root.get("data").is_some() {
        &root["data"]
    } else {
        &root
    };

    if data["e"].as_str() != Some("kline") {
        return Ok(None);
    }

    let symbol = data["s"].as_str().context("missing field s")?;
    let k = &data["k"];

    let interval = k["i"].as_str().context("missing field k.i")?.to_string();
    let open_time = k["t"].as_i64().context("missing field k.t")?;

    let candle = Candle {
        open_time,
        open: parse_str_f64(&k["o"], "k.o")?,
        high: parse_str_f64(&k["h"], "k.h")?,
        low: parse_str_f64(&k["l"], "k.l")?,
        close: parse_str_f64(&k["c"], "k.c")?,
        volume: parse_str_f64(&k["v"], "k.v")?,
    };

    Ok(Some((SeriesKey::new(symbol, interval), candle)))
}
