// =============================================================================
// Shared types used across the market-data engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV observation for one fixed time bucket, keyed by the open
/// time (ms since epoch) of its period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: String,
}

impl SeriesKey {
    /// Symbols are normalised to uppercase so lookups are case-insensitive on
    /// the caller side.
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        let symbol: String = symbol.into();
        Self {
            symbol: symbol.to_uppercase(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}
