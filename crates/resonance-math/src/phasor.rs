// ─────────────────────────────────────────────────────────────────────
// Resonance — Phasor Algebra
// ─────────────────────────────────────────────────────────────────────
//! Polar complex numbers for coherent superposition of timing phases.

use std::f64::consts::PI;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Phasor {
    pub amplitude: f64,
    /// Radians.
    pub phase: f64,
}

impl Phasor {
    pub fn new(amplitude: f64, phase: f64) -> Self {
        Self { amplitude, phase }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            amplitude: x.hypot(y),
            phase: y.atan2(x),
        }
    }

    fn to_cartesian(self) -> (f64, f64) {
        let (s, c) = self.phase.sin_cos();
        (self.amplitude * c, self.amplitude * s)
    }

    pub fn scale(self, k: f64) -> Self {
        Self {
            amplitude: self.amplitude * k,
            phase: self.phase,
        }
    }

    pub fn conjugate(self) -> Self {
        Self {
            amplitude: self.amplitude,
            phase: -self.phase,
        }
    }

    /// Phases within `threshold` radians of each other (mod 2π).
    pub fn is_aligned(self, other: Phasor, threshold: f64) -> bool {
        normalize_angle(self.phase - other.phase).abs() < threshold
    }
}

impl Add for Phasor {
    type Output = Phasor;

    fn add(self, rhs: Phasor) -> Phasor {
        let (x1, y1) = self.to_cartesian();
        let (x2, y2) = rhs.to_cartesian();
        Phasor::from_cartesian(x1 + x2, y1 + y2)
    }
}

impl Sub for Phasor {
    type Output = Phasor;

    fn sub(self, rhs: Phasor) -> Phasor {
        self + Phasor::new(rhs.amplitude, rhs.phase + PI)
    }
}

/// Wrap to [−π, π].
pub fn normalize_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI && a > 0.0 {
        PI
    } else {
        wrapped
    }
}
