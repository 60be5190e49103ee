// ─────────────────────────────────────────────────────────────────────
// Resonance — Score Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Neutral score used whenever a component cannot be estimated.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Why a component fell back to the neutral score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer tail samples than the fit needs.
    InsufficientSamples { needed: usize, got: usize },
    /// Too few values above the threshold.
    InsufficientExceedances { needed: usize, got: usize },
    /// The GPD fit or quantile evaluation failed.
    FitFailed { message: String },
    /// No nodes or no edges to evaluate.
    EmptyGraph,
    /// Nominal service at the horizon is zero.
    NonPositiveNominal,
}

/// Whether a score was computed or substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    Computed,
    Fallback(FallbackReason),
}

/// A component score in [0, 1] with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub value: f64,
    pub status: ScoreStatus,
}

impl ComponentScore {
    pub fn computed(value: f64) -> Self {
        Self {
            value: clamp_score(value, 0.0, 1.0),
            status: ScoreStatus::Computed,
        }
    }

    pub fn value_or(value: f64, reason: FallbackReason) -> Self {
        Self {
            value: clamp_score(value, 0.0, 1.0),
            status: ScoreStatus::Fallback(reason),
        }
    }

    pub fn neutral(reason: FallbackReason) -> Self {
        Self::value_or(NEUTRAL_SCORE, reason)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ScoreStatus::Fallback(_))
    }
}

/// Aggregation weights for coherence, tail-health and timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceWeights {
    pub coherence: f64,
    pub tail: f64,
    pub timing: f64,
}

impl Default for ResonanceWeights {
    fn default() -> Self {
        Self {
            coherence: 1.0,
            tail: 1.0,
            timing: 1.0,
        }
    }
}

/// Full output of one Resonance-Calculus cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceBreakdown {
    /// Aggregate resonance R ∈ [0, 1].
    pub r: f64,
    /// Maximum cycle mean of the dependency graph (0 when not computed).
    pub lambda_res: f64,
    pub coherence: ComponentScore,
    pub tail_health: ComponentScore,
    pub timing: ComponentScore,
}

impl ResonanceBreakdown {
    /// True when any component fell back to a substitute value.
    pub fn is_degraded(&self) -> bool {
        self.coherence.is_degraded() || self.tail_health.is_degraded() || self.timing.is_degraded()
    }
}
