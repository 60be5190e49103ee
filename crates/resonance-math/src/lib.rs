// ─────────────────────────────────────────────────────────────────────
// Resonance — Resonance Calculus
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Mathematical primitives fused by the admission controller:
//!
//!   - Service curves: rate-latency β and the coherence-weighted β_c
//!   - Extreme-value tails: GPD fit by probability-weighted moments
//!   - Max-plus algebra: tropical semiring, Karp maximum cycle mean
//!   - Network calculus: backlog/delay bounds from arrival/service windows
//!   - Aggregation of component scores into a single resonance R
//!
//! Everything here is pure and allocation-light; the bounded graph and
//! sample sizes used by the controller keep Karp at O(n²·n) and the GPD
//! fit at O(n log n).

pub mod aggregate;
pub mod gpd;
pub mod karp;
pub mod log_semiring;
pub mod netcalc;
pub mod phasor;
pub mod service;
pub mod tropical;

pub use aggregate::{aggregate_resonance, ResonanceComponents};
pub use gpd::{
    fit_gpd_pwm, gpd_exceedance_quantile, gpd_survival, pwm_moments, tail_quantile_from_gpd,
    GpdParams, MIN_EXCEEDANCES,
};
pub use karp::{build_weight_matrix, max_cycle_mean_karp, CycleMean, GraphEdge, WeightMatrix};
pub use netcalc::{
    backlog_bound, delay_bound, max_plus_convolve, min_plus_deconvolve, BacklogForecaster,
    CalculusAction, CalculusDecision,
};
pub use phasor::{normalize_angle, Phasor};
pub use service::{
    beta_coherence_weighted, beta_rate_latency, coherence_integral_delta, CoherenceSample,
    RateLatency,
};
pub use tropical::{critical_path, trop_add, trop_matrix_mul, trop_mul, tropical_closure, TROP_ONE, TROP_ZERO};
