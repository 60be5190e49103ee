// ─────────────────────────────────────────────────────────────────────
// Resonance — Spectral Entropy
// ─────────────────────────────────────────────────────────────────────
//! Normalised Shannon entropy of a magnitude spectrum.
//!
//! - Low entropy (< 0.2): rigid, over-locked, harmonic timing
//! - High entropy (> 0.8): noisy, uncoordinated, broad spectrum
//! - [0.2, 0.8]: healthy

use serde::{Deserialize, Serialize};

/// Default healthy band.
pub const HEALTHY_BAND: [f64; 2] = [0.2, 0.8];

/// Floor applied to non-positive magnitudes before normalising.
const MAG_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntropyState {
    TooRigid,
    TooNoisy,
    Healthy,
}

/// Spectral entropy H / H_max ∈ [0, 1] of `mag`.
///
/// Returns 0 for spectra with fewer than two bins (H_max = 0).
pub fn spectral_entropy(mag: &[f64]) -> f64 {
    if mag.len() < 2 {
        return 0.0;
    }
    let sum: f64 = mag.iter().sum();
    let sum = if sum == 0.0 { 1.0 } else { sum };

    let h: f64 = mag
        .iter()
        .map(|&m| (if m > 0.0 { m } else { MAG_FLOOR }) / sum)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum();

    let h_max = (mag.len() as f64).ln();
    (h / h_max).clamp(0.0, 1.0)
}

pub fn is_entropy_in_band(entropy: f64, band: [f64; 2]) -> bool {
    entropy >= band[0] && entropy <= band[1]
}

pub fn entropy_state(entropy: f64) -> EntropyState {
    if entropy < HEALTHY_BAND[0] {
        EntropyState::TooRigid
    } else if entropy > HEALTHY_BAND[1] {
        EntropyState::TooNoisy
    } else {
        EntropyState::Healthy
    }
}
