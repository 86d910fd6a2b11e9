// =============================================================================
// Settings — environment-driven engine configuration
// =============================================================================
//
// The tracked universe (symbols x intervals), buffer limits, and exchange
// endpoints are fixed at construction time and supplied to the market data
// service from here. Defaults target Binance.US; set BINANCE_REST_URL /
// BINANCE_WS_URL for other regions.
// =============================================================================

use std::time::Duration;

/// Tracked pairs, endpoints, and buffer limits for the market-data engine.
#[derive(Debug, Clone)]
pub struct Settings {
    /// REST base including the version path, e.g. `https://api.binance.us/api/v3`.
    pub rest_base: String,

    /// WebSocket base without a path, e.g. `wss://stream.binance.us:9443`.
    pub stream_base: String,

    /// Symbols the engine tracks (surveillance universe).
    pub symbols: Vec<String>,

    /// Intervals kept per symbol:
    ///   1m: charts and high-frequency views
    ///   15m: structural analysis
    ///   1h: bands and z-score calculation
    pub intervals: Vec<String>,

    /// Candles retained per series.
    pub history_limit: usize,

    /// Fixed delay before retrying a failed stream connection.
    pub reconnect_backoff: Duration,

    /// Address the HTTP API binds to.
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rest_base: "https://api.binance.us/api/v3".to_string(),
            stream_base: "wss://stream.binance.us:9443".to_string(),
            symbols: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
                "BNBUSDT".to_string(),
                "XRPUSDT".to_string(),
            ],
            intervals: vec!["1m".to_string(), "15m".to_string(), "1h".to_string()],
            history_limit: 300,
            reconnect_backoff: Duration::from_secs(5),
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from the environment, falling back to defaults for any
    /// unset or unparseable variable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(url) = std::env::var("BINANCE_REST_URL") {
            settings.rest_base = url;
        }
        if let Ok(url) = std::env::var("BINANCE_WS_URL") {
            settings.stream_base = url;
        }
        if let Ok(raw) = std::env::var("QUANTDESK_SYMBOLS") {
            let symbols: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !symbols.is_empty() {
                settings.symbols = symbols;
            }
        }
        if let Ok(raw) = std::env::var("QUANTDESK_INTERVALS") {
            let intervals: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !intervals.is_empty() {
                settings.intervals = intervals;
            }
        }
        if let Ok(raw) = std::env::var("QUANTDESK_HISTORY_LIMIT") {
            if let Ok(limit) = raw.parse::<usize>() {
                if limit > 0 {
                    settings.history_limit = limit;
                }
            }
        }
        if let Ok(addr) = std::env::var("QUANTDESK_BIND_ADDR") {
            settings.bind_addr = addr;
        }

        settings
    }
}
