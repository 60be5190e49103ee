// ─────────────────────────────────────────────────────────────────────
// Resonance — Engine Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ResonanceError, ResonanceResult};
use crate::score::ResonanceWeights;
use crate::state::Mode;

/// Largest accepted micro-delay ceiling, in milliseconds.
pub const MAX_MICRO_DELAY_CEILING_MS: f64 = 60_000.0;

/// Band controller configuration.
///
/// Supplied at construction and mergeable at runtime through
/// [`ControllerConfigPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Target coherence band `[R_low, R_high]`.
    /// Default: [0.35, 0.65].
    pub r_band: [f64; 2],

    /// Lower bound for the coupling strength K.
    /// Default: 0.05.
    pub k_min: f64,

    /// Upper bound for the coupling strength K.
    /// Default: 1.0.
    pub k_max: f64,

    /// Ceiling for the anti-herd micro-delay, in milliseconds.
    /// Default: 7.
    pub max_micro_delay_ms: f64,

    /// Latency budget a caller may spend filling a suggested batch.
    /// Default: 25.
    pub default_batch_latency_ms: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            r_band: [0.35, 0.65],
            k_min: 0.05,
            k_max: 1.0,
            max_micro_delay_ms: 7.0,
            default_batch_latency_ms: 25.0,
        }
    }
}

impl ControllerConfig {
    pub fn r_low(&self) -> f64 {
        self.r_band[0]
    }

    pub fn r_high(&self) -> f64 {
        self.r_band[1]
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> ResonanceResult<()> {
        let [lo, hi] = self.r_band;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) {
            return Err(ResonanceError::Config(format!(
                "r_band must lie in [0, 1], got [{lo}, {hi}]"
            )));
        }
        if lo > hi {
            return Err(ResonanceError::Config(format!(
                "r_band lower bound {lo} exceeds upper bound {hi}"
            )));
        }
        if !self.k_min.is_finite() || !self.k_max.is_finite() || self.k_min > self.k_max {
            return Err(ResonanceError::Config(format!(
                "k_min must be <= k_max, got {} > {}",
                self.k_min, self.k_max
            )));
        }
        if !(0.0..=MAX_MICRO_DELAY_CEILING_MS).contains(&self.max_micro_delay_ms) {
            return Err(ResonanceError::Config(format!(
                "max_micro_delay_ms must lie in [0, {MAX_MICRO_DELAY_CEILING_MS}], got {}",
                self.max_micro_delay_ms
            )));
        }
        if !(self.default_batch_latency_ms >= 0.0) {
            return Err(ResonanceError::Config(format!(
                "default_batch_latency_ms must be >= 0, got {}",
                self.default_batch_latency_ms
            )));
        }
        Ok(())
    }

    /// Merge a partial update; unset fields keep their current value.
    pub fn merge(&mut self, patch: &ControllerConfigPatch) {
        if let Some(band) = patch.r_band {
            self.r_band = band;
        }
        if let Some(k_min) = patch.k_min {
            self.k_min = k_min;
        }
        if let Some(k_max) = patch.k_max {
            self.k_max = k_max;
        }
        if let Some(d) = patch.max_micro_delay_ms {
            self.max_micro_delay_ms = d;
        }
        if let Some(b) = patch.default_batch_latency_ms {
            self.default_batch_latency_ms = b;
        }
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ResonanceResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ResonanceError::Config(format!("JSON parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Partial controller configuration for runtime updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfigPatch {
    pub r_band: Option<[f64; 2]>,
    pub k_min: Option<f64>,
    pub k_max: Option<f64>,
    pub max_micro_delay_ms: Option<f64>,
    pub default_batch_latency_ms: Option<f64>,
}

/// Parameters of the Resonance-Calculus path used by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculusConfig {
    /// Horizon t at which service curves are compared, in seconds.
    pub horizon_s: f64,
    /// Nominal service rate R (requests per second).
    pub service_rate: f64,
    /// Nominal service latency T, in seconds.
    pub service_latency_s: f64,
    /// Sensitivity λ of the coherence integral.
    pub coherence_lambda: f64,
    /// Baseline coherence c̄.
    pub coherence_baseline: f64,
    /// Quantile at which the GPD threshold is picked.
    pub tail_threshold_quantile: f64,
    /// Coherence samples older than this are left out of the integral.
    pub coherence_window_s: f64,
    /// History size required before the calculus path is attempted.
    pub min_history: usize,
    /// Bounded coherence history length.
    pub history_capacity: usize,
    /// Number of percentile-grid samples drawn from the histogram.
    pub tail_sample_count: usize,
    /// Base delay of a dependency-graph edge.
    pub graph_base_delay: f64,
    /// Aggregation weights for the three component scores.
    pub weights: ResonanceWeights,
}

impl Default for CalculusConfig {
    fn default() -> Self {
        Self {
            horizon_s: 5.0,
            service_rate: 100.0,
            service_latency_s: 0.1,
            coherence_lambda: 1.0,
            coherence_baseline: 0.5,
            tail_threshold_quantile: 0.95,
            coherence_window_s: 10.0,
            min_history: 10,
            history_capacity: 100,
            tail_sample_count: 400,
            graph_base_delay: 10.0,
            weights: ResonanceWeights::default(),
        }
    }
}

impl CalculusConfig {
    pub fn validate(&self) -> ResonanceResult<()> {
        if !(self.horizon_s > 0.0) {
            return Err(ResonanceError::Config(format!(
                "horizon_s must be > 0, got {}",
                self.horizon_s
            )));
        }
        if !(self.service_rate >= 0.0) || !(self.service_latency_s >= 0.0) {
            return Err(ResonanceError::Config(
                "service_rate and service_latency_s must be >= 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.tail_threshold_quantile) {
            return Err(ResonanceError::Config(format!(
                "tail_threshold_quantile must be in [0, 1), got {}",
                self.tail_threshold_quantile
            )));
        }
        if self.history_capacity == 0 || self.min_history > self.history_capacity {
            return Err(ResonanceError::Config(format!(
                "min_history ({}) must be <= history_capacity ({}) and capacity > 0",
                self.min_history, self.history_capacity
            )));
        }
        let w = &self.weights;
        if w.coherence < 0.0 || w.tail < 0.0 || w.timing < 0.0 {
            return Err(ResonanceError::Config(
                "resonance weights must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub controller: ControllerConfig,
    pub calculus: CalculusConfig,
    /// Starting coupling strength. Default: 0.3.
    pub initial_k: f64,
    /// Starting mode. Default: observe.
    pub initial_mode: Mode,
    /// When set, K updates are exponentially smoothed with this factor.
    pub coupling_smoothing: Option<f64>,
    /// Derive R from the Resonance Calculus once enough history exists.
    pub use_calculus: bool,
    /// Record task arrivals and completions for backlog forecasting.
    pub track_backlog: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            calculus: CalculusConfig::default(),
            initial_k: 0.3,
            initial_mode: Mode::Observe,
            coupling_smoothing: None,
            use_calculus: true,
            track_backlog: true,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> ResonanceResult<()> {
        self.controller.validate()?;
        self.calculus.validate()?;
        if let Some(alpha) = self.coupling_smoothing {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ResonanceError::Config(format!(
                    "coupling_smoothing must be in [0, 1], got {alpha}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> ResonanceResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ResonanceError::Config(format!("JSON parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
