// ─────────────────────────────────────────────────────────────────────
// Resonance — Admission Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Feedback-controlled admission engine: latency histogram, resonance
//! bridge, actuator executor and the orchestrating [`ResonanceCore`].
//!
//! # Invariants
//!
//! 1. **Observe never touches timing**: in `Mode::Observe` the wrapped
//!    task is invoked directly, whatever the controller would decide.
//!
//! 2. **Calculus failures never escape `update()`**: a bridge error is
//!    logged and replaced by the phase-based R, reported through
//!    `RSource::PhaseFallback`.
//!
//! 3. **Bounded memory**: coherence history, actuation log, backlog
//!    series and histogram buckets trim themselves on write.
//!
//! 4. **No lock across an await**: decisions are resolved into an
//!    `ActuationPlan` under the state lock; delays run after release.

pub mod actuators;
pub mod bridge;
pub mod clock;
pub mod engine;
pub mod histogram;

pub use actuators::{
    delay_then_invoke, ActuationKind, ActuationLogger, ActuationPlan, ActuationRecord,
};
pub use bridge::{build_dependency_graph, compute_resonance, ResonanceInputs};
pub use clock::{Clock, ManualClock, TokioClock};
pub use engine::{ResonanceCore, StateObserver};
pub use histogram::{LatencyHistogram, Percentiles, TailSample};
