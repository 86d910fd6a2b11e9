// =============================================================================
// Exchange REST client — public market-data endpoints
// =============================================================================
//
// Only public (unsigned) endpoints are used; the client carries no
// credentials. One instance is shared across all backfill tasks: reqwest's
// Client is internally pooled and safe for concurrent request issuance.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::types::Candle;

/// REST client for the exchange's public market-data API.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeClient {
    /// Create a new client against `base_url` (including the version path,
    /// e.g. `https://api.binance.us/api/v3`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// GET /klines — bulk historical candles for one (symbol, interval) pair.
    ///
    /// The response is an array of fixed-position arrays:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
    /// Trailing positions (close time, quote volume, trade count) are ignored.
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("GET /klines returned {}: {}", status, body);
        }

        let candles = parse_klines_body(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

/// Decode the klines array-of-arrays body into candles, preserving order.
///
/// Rows with fewer than six positions are skipped with a warning; a body that
/// is not an array at all is an error (the whole fetch failed).
fn parse_klines_body(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        candles.push(Candle {
            open_time: arr[0].as_i64().context("kline openTime is not an integer")?,
            open: parse_str_f64(&arr[1], "open")?,
            high: parse_str_f64(&arr[2], "high")?,
            low: parse_str_f64(&arr[3], "low")?,
            close: parse_str_f64(&arr[4], "close")?,
            volume: parse_str_f64(&arr[5], "volume")?,
        });
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
/// The exchange sends prices as JSON strings in most payloads.
pub(crate) fn parse_str_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_klines_body_ok() {
        let body = serde_json::json!([
            [1700000000000i64, "37000.0", "37050.0", "36990.0", "37020.0", "123.4", 1700000059999i64],
            [1700000060000i64, "37020.0", "37100.0", "37010.0", "37080.0", "98.7", 1700000119999i64]
        ]);
        let candles = parse_klines_body(&body).expect("should parse");
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1700000000000);
        assert!((candles[1].close - 37080.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_klines_body_skips_short_rows() {
        let body = serde_json::json!([
            [1700000000000i64, "1.0", "2.0"],
            [1700000060000i64, "1.0", "2.0", "0.5", "1.5", "10.0"]
        ]);
        let candles = parse_klines_body(&body).expect("should parse");
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 1700000060000);
    }

    #[test]
    fn parse_klines_body_rejects_non_array() {
        let body = serde_json::json!({ "code": -1121, "msg": "Invalid symbol." });
        assert!(parse_klines_body(&body).is_err());
    }

    #[test]
    fn parse_str_f64_accepts_string_and_number() {
        assert!((parse_str_f64(&serde_json::json!("1.5"), "x").unwrap() - 1.5).abs() < f64::EPSILON);
        assert!((parse_str_f64(&serde_json::json!(2.5), "x").unwrap() - 2.5).abs() < f64::EPSILON);
        assert!(parse_str_f64(&serde_json::json!(true), "x").is_err());
        assert!(parse_str_f64(&serde_json::json!("abc"), "x").is_err());
    }
}
