// ─────────────────────────────────────────────────────────────────────
// Resonance — Adaptive Coupling K(t)
// ─────────────────────────────────────────────────────────────────────
//! K_{t+1} = clamp(K_t + a·σ_θ − b·risk, K_min, K_max)
//!
//! Dispersion pulls K up (more coordination); tail risk pushes it down
//! (less interference).

use serde::{Deserialize, Serialize};

pub const COUPLING_DISPERSION_WEIGHT: f64 = 0.5;
pub const COUPLING_RISK_WEIGHT: f64 = 0.7;

/// Risk reported when no latency has been observed.
const EMPTY_RISK: f64 = 0.1;

/// One coupling step. A non-finite step keeps `k` (clamped to the bounds).
pub fn adapt_k(k: f64, sigma_theta: f64, p99_risk: f64, k_min: f64, k_max: f64) -> f64 {
    let next = k + COUPLING_DISPERSION_WEIGHT * sigma_theta - COUPLING_RISK_WEIGHT * p99_risk;
    if next.is_finite() {
        next.clamp(k_min, k_max)
    } else {
        log::debug!("adapt_k: non-finite step (sigma={sigma_theta}, risk={p99_risk}); K held");
        if k.is_finite() { k.clamp(k_min, k_max) } else { k_min }
    }
}

/// Tail-risk proxy: min(1, max(latencies) / target).
pub fn estimate_p99_risk(latencies: &[f64], target_p99: f64) -> f64 {
    if latencies.is_empty() {
        return EMPTY_RISK;
    }
    if target_p99 <= 0.0 {
        return 1.0;
    }
    let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (max / target_p99).clamp(0.0, 1.0)
}

/// Exponential relaxation of K toward its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothCoupling {
    current: f64,
    target: f64,
    alpha: f64,
}

impl SmoothCoupling {
    pub const DEFAULT_ALPHA: f64 = 0.3;

    pub fn new(initial_k: f64) -> Self {
        Self {
            current: initial_k,
            target: initial_k,
            alpha: Self::DEFAULT_ALPHA,
        }
    }

    pub fn with_alpha(initial_k: f64, alpha: f64) -> Self {
        let mut s = Self::new(initial_k);
        s.set_smoothing(alpha);
        s
    }

    /// Set the target and move the current value one step toward it.
    pub fn update(&mut self, target: f64) -> f64 {
        self.target = target;
        self.current = self.current * (1.0 - self.alpha) + self.target * self.alpha;
        self.current
    }

    pub fn get(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_smoothing(&mut self, alpha: f64) {
        self.alpha = if alpha.is_nan() { Self::DEFAULT_ALPHA } else { alpha.clamp(0.0, 1.0) };
    }

    /// Snap both current and target to `k`.
    pub fn reset(&mut self, k: f64) {
        self.current = k;
        self.target = k;
    }
}
