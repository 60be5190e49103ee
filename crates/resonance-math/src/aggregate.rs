// ─────────────────────────────────────────────────────────────────────
// Resonance — Score Aggregation
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use resonance_types::{clamp_score, ResonanceWeights};

const WEIGHT_FLOOR: f64 = 1e-9;

/// Component scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceComponents {
    pub coherence: f64,
    pub tail_health: f64,
    pub timing: f64,
}

/// Weighted mean of the three components, clamped to [0, 1].
pub fn aggregate_resonance(c: &ResonanceComponents, w: &ResonanceWeights) -> f64 {
    let num = w.coherence * c.coherence + w.tail * c.tail_health + w.timing * c.timing;
    let den = (w.coherence + w.tail + w.timing).max(WEIGHT_FLOOR);
    clamp_score(num / den, 0.0, 1.0)
}
