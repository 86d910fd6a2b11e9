// =============================================================================
// Alert scoring — threshold evaluation of a market snapshot
// =============================================================================
//
// Stateless: the caller posts its current view of a symbol and receives a
// verdict. Delivery of the alert is the caller's concern.

use serde::{Deserialize, Serialize};

/// Z-score magnitude considered a dislocation worth mentioning.
const ZSCORE_DISLOCATION: f64 = 2.0;
/// Tactical probability (percent) that triggers an alert on its own.
const TACTICAL_PROB_ALERT: f64 = 75.0;
/// Minimum tactical probability (percent) for a sweep to trigger an alert.
const SWEEP_PROB_FLOOR: f64 = 60.0;

/// Caller-supplied market snapshot for one symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSnapshot {
    pub symbol: String,
    pub price: f64,
    #[serde(default)]
    pub z_score: f64,
    #[serde(default)]
    pub tactical_probability: f64,
    #[serde(default)]
    pub ai_score: f64,
    #[serde(default)]
    pub sweeps: Vec<SweepEvent>,
}

/// A detected liquidity sweep, most recent first.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepEvent {
    pub side: String,
}

/// Scoring verdict for a snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertVerdict {
    pub should_alert: bool,
    pub passed_conditions: Vec<String>,
    pub score: usize,
    pub direction: String,
    pub confidence: f64,
}

/// Evaluate the alert conditions for a snapshot.
///
/// A z-score dislocation alone is noted but does not fire an alert; a high
/// tactical probability does, as does a sell-side liquidity sweep backed by a
/// probability above the floor.
pub fn evaluate(snapshot: &AlertSnapshot) -> AlertVerdict {
    let mut should_alert = false;
    let mut reasons = Vec::new();

    if snapshot.z_score.abs() > ZSCORE_DISLOCATION {
        reasons.push(format!("z-score dislocation ({:.2})", snapshot.z_score));
    }

    if snapshot.tactical_probability > TACTICAL_PROB_ALERT {
        reasons.push(format!(
            "tactical probability high ({:.0}%)",
            snapshot.tactical_probability
        ));
        should_alert = true;
    }

    if let Some(sweep) = snapshot.sweeps.first() {
        if sweep.side == "SELL" && snapshot.tactical_probability > SWEEP_PROB_FLOOR {
            reasons.push("liquidity sweep (long)".to_string());
            should_alert = true;
        }
    }

    let direction = if snapshot.ai_score > 0.0 { "LONG" } else { "SHORT" };

    AlertVerdict {
        should_alert,
        score: reasons.len(),
        passed_conditions: reasons,
        direction: direction.to_string(),
        confidence: snapshot.ai_score,
    }
}
