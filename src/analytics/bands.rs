// =============================================================================
// Z-Score Bands
// =============================================================================
//
// Bands around a simple moving average at one and two standard deviations:
// upper/lower_1 = SMA ± σ, upper/lower_2 = SMA ± 2σ. σ is the sample standard
// deviation (n-1 degrees of freedom) over the window, matching a rolling-
// window calculation.

use serde::Serialize;

/// Band levels around a simple moving average.
#[derive(Debug, Clone, Serialize)]
pub struct ZScoreBands {
    pub sma: f64,
    pub std_dev: f64,
    pub upper_1: f64,
    pub lower_1: f64,
    pub upper_2: f64,
    pub lower_2: f64,
}

/// Calculate z-score bands over the last `period` closes.
///
/// Returns `None` when:
/// - Fewer than `period` data points (or `period < 2`).
/// - The result degenerates (non-finite input).
pub fn zscore_bands(closes: &[f64], period: usize) -> Option<ZScoreBands> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let sma = window.iter().sum::<f64>() / period as f64;

    let variance =
        window.iter().map(|x| (x - sma).powi(2)).sum::<f64>() / (period as f64 - 1.0);
    let std_dev = variance.sqrt();

    if !sma.is_finite() || !std_dev.is_finite() {
        return None;
    }

    Some(ZScoreBands {
        sma,
        std_dev,
        upper_1: sma + std_dev,
        lower_1: sma - std_dev,
        upper_2: sma + 2.0 * std_dev,
        lower_2: sma - 2.0 * std_dev,
    })
}
