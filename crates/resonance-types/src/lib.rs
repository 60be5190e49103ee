// ─────────────────────────────────────────────────────────────────────
// Resonance — Core Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy shared by every
//! crate of the Resonance admission engine.

pub mod config;
pub mod error;
pub mod score;
pub mod state;
pub mod task;

pub use config::{
    CalculusConfig, ControllerConfig, ControllerConfigPatch, CoreConfig, MAX_MICRO_DELAY_CEILING_MS,
};
pub use error::{ResonanceError, ResonanceResult};
pub use score::{
    clamp_score, ComponentScore, FallbackReason, ResonanceBreakdown, ResonanceWeights,
    ScoreStatus,
};
pub use state::{Features, Mode, RSource, ResonanceSnapshot, ResonanceState};
pub use task::{
    Actuators, BackoffStrategy, HedgeConfig, Importance, PhaseAffinity, RetryConfig, TaskHint,
    TokenBucketConfig,
};
