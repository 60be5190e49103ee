// ─────────────────────────────────────────────────────────────────────
// Resonance — Phase Tracking
// ─────────────────────────────────────────────────────────────────────
//! Turns request timestamps into phase samples for the Kuramoto
//! estimator: period detection from inter-arrival intervals, phase by
//! modulo against that period, and a first-order PLL for a soft global
//! tempo.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use resonance_math::normalize_angle;

/// First-order phase-locked loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pll {
    phase: f64,
    bandwidth: f64,
}

impl Default for Pll {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl Pll {
    pub fn new(bandwidth: f64) -> Self {
        Self {
            phase: 0.0,
            bandwidth,
        }
    }

    /// Advance by `dt_s` seconds at `freq` rad/s and pull toward the
    /// measurement. Returns the tracked phase in [−π, π].
    pub fn tick(&mut self, freq: f64, measured_phase: f64, dt_s: f64) -> f64 {
        let err = normalize_angle(measured_phase - self.phase);
        self.phase = normalize_angle(self.phase + freq * dt_s + self.bandwidth * err);
        self.phase
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidth = bandwidth;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Minimum timestamps for period detection.
pub const MIN_PERIOD_SAMPLES: usize = 10;
const PERIOD_BIN_MS: f64 = 100.0;

pub struct PhaseEstimator {
    window_ms: f64,
    rng: StdRng,
}

impl Default for PhaseEstimator {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}

impl PhaseEstimator {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(window_ms: f64, seed: u64) -> Self {
        Self {
            window_ms,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    /// Phase of the latest timestamp within `period_ms`, in [0, 2π).
    ///
    /// Without a usable period (or timestamps) the phase is uniform random.
    pub fn estimate_phase(&mut self, timestamps_ms: &[f64], period_ms: Option<f64>) -> f64 {
        match (timestamps_ms.last(), period_ms) {
            (Some(&latest), Some(p)) if p > 0.0 => latest.rem_euclid(p) / p * TAU,
            _ => {
                log::debug!("no usable period ({period_ms:?}); drawing a random phase");
                self.rng.gen::<f64>() * TAU
            }
        }
    }

    /// Mode of the inter-arrival intervals rounded to 100 ms bins.
    ///
    /// Needs at least ten timestamps; the zero bin never counts.
    /// Ties go to the shorter period.
    pub fn detect_period(&self, timestamps_ms: &[f64]) -> Option<f64> {
        if timestamps_ms.len() < MIN_PERIOD_SAMPLES {
            log::debug!(
                "detect_period: {} timestamps, need {MIN_PERIOD_SAMPLES}",
                timestamps_ms.len()
            );
            return None;
        }
        let mut hist: BTreeMap<i64, usize> = BTreeMap::new();
        for pair in timestamps_ms.windows(2) {
            let bin = ((pair[1] - pair[0]) / PERIOD_BIN_MS).round() as i64;
            if bin > 0 {
                *hist.entry(bin).or_default() += 1;
            }
        }
        hist.into_iter()
            .fold(None, |best: Option<(i64, usize)>, (bin, count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((bin, count)),
            })
            .map(|(bin, _)| bin as f64 * PERIOD_BIN_MS)
    }

    /// Detect the period, then estimate the phase against it.
    pub fn phase_of(&mut self, timestamps_ms: &[f64]) -> f64 {
        let period = self.detect_period(timestamps_ms);
        self.estimate_phase(timestamps_ms, period)
    }
}
