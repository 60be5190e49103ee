// ─────────────────────────────────────────────────────────────────────
// Resonance — Coherence Physics and Control
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Kuramoto coherence estimation, adaptive coupling K(t), the PI band
//! controller that maps features to actuators, and phase tracking from
//! request timestamps.

pub mod controller;
pub mod coupling;
pub mod kuramoto;
pub mod phase;

pub use controller::{BandController, PiIntegrator};
pub use coupling::{adapt_k, estimate_p99_risk, SmoothCoupling, COUPLING_DISPERSION_WEIGHT, COUPLING_RISK_WEIGHT};
pub use kuramoto::{circular_std_dev, order_parameter, phase_dispersion, OrderParameter};
pub use phase::{PhaseEstimator, Pll};
