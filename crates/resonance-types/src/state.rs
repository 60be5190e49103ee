// ─────────────────────────────────────────────────────────────────────
// Resonance — Controller State
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResonanceError;
use crate::score::ResonanceBreakdown;

/// Operating mode of a core instance.
///
/// Changed only through explicit `set_mode` calls; any mode may move to
/// any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Measure only. Tasks run untouched.
    #[default]
    Observe,
    /// Compute and record decisions without enforcing them.
    Shadow,
    /// Enforce decisions.
    Active,
    /// Enforce decisions (coupling-adaptive deployments).
    Adaptive,
}

impl Mode {
    /// Whether controller actuation is applied to tasks.
    pub fn enforces(self) -> bool {
        matches!(self, Mode::Active | Mode::Adaptive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Observe => "observe",
            Mode::Shadow => "shadow",
            Mode::Active => "active",
            Mode::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observe" => Ok(Mode::Observe),
            "shadow" => Ok(Mode::Shadow),
            "active" => Ok(Mode::Active),
            "adaptive" => Ok(Mode::Adaptive),
            other => Err(ResonanceError::Validation(format!("unknown mode '{other}'"))),
        }
    }
}

/// Mutable controller state, one per core instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceState {
    /// Coherence R ∈ [0, 1] (calculus-derived or phase-based).
    pub r: f64,
    /// Spectral entropy ∈ [0, 1] of the timing pattern.
    pub spectral_entropy: f64,
    /// Coupling strength K ∈ [K_min, K_max].
    pub k: f64,
    pub mode: Mode,
}

impl Default for ResonanceState {
    fn default() -> Self {
        Self {
            r: 0.0,
            spectral_entropy: 0.5,
            k: 0.3,
            mode: Mode::Observe,
        }
    }
}

/// Where the published R came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RSource {
    /// Phase-based R because the history is still filling (or the
    /// calculus path is disabled).
    Warmup,
    /// Aggregate Resonance-Calculus R.
    Calculus,
    /// The calculus path failed; phase-based R substituted.
    PhaseFallback { reason: String },
}

/// Controller input features derived from the latest update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub r: f64,
    pub spectral_entropy: f64,
    pub p99_risk: f64,
    /// Phase dispersion 1 − R_phase.
    pub sigma_theta: f64,
    pub backlog_bound: Option<f64>,
    pub source: RSource,
}

/// Read-only snapshot published to observers and telemetry exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceSnapshot {
    pub state: ResonanceState,
    /// Last calculus breakdown, if the calculus path has produced one.
    pub breakdown: Option<ResonanceBreakdown>,
}
