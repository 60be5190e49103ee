// ─────────────────────────────────────────────────────────────────────
// Resonance — Kuramoto Order Parameter
// ─────────────────────────────────────────────────────────────────────
//! R e^{iψ} = (1/N) Σ_n e^{iθ_n}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderParameter {
    /// Coherence R ∈ [0, 1].
    pub r: f64,
    /// Mean phase ψ (rad).
    pub psi: f64,
}

/// Order parameter of a phase vector. An empty vector yields R = 0.
///
/// Non-finite phases are skipped and do not count towards N.
pub fn order_parameter(phases: &[f64]) -> OrderParameter {
    let (count, sum_sin, sum_cos) = phases
        .iter()
        .filter(|th| th.is_finite())
        .fold((0usize, 0.0, 0.0), |(n, s, c), &th| (n + 1, s + th.sin(), c + th.cos()));
    if count < phases.len() {
        log::debug!("order_parameter: skipped {} non-finite phases", phases.len() - count);
    }
    let n = count.max(1) as f64;
    let (im, re) = (sum_sin / n, sum_cos / n);
    OrderParameter {
        r: re.hypot(im).clamp(0.0, 1.0),
        psi: im.atan2(re),
    }
}

/// 1 − R.
pub fn phase_dispersion(phases: &[f64]) -> f64 {
    1.0 - order_parameter(phases).r
}

/// √(−2 ln R); +∞ when R = 0.
pub fn circular_std_dev(phases: &[f64]) -> f64 {
    (-2.0 * order_parameter(phases).r.ln()).sqrt()
}
