// ─────────────────────────────────────────────────────────────────────
// Resonance — Spectral Diagnostics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Timing-pattern diagnostics feeding the controller:
//!
//!   - Spectral entropy: rigidity vs. noise of request timing
//!   - PLV: pairwise phase locking between oscillator series
//!   - STFT: windowed magnitude spectra of event series

pub mod entropy;
pub mod plv;
pub mod stft;

pub use entropy::{entropy_state, is_entropy_in_band, spectral_entropy, EntropyState};
pub use plv::{detect_communities, plv, plv_matrix, PlvEdge};
pub use stft::{find_peaks, stft, Spectrogram};
