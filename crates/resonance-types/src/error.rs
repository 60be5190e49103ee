// ─────────────────────────────────────────────────────────────────────
// Resonance — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Resonance core failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResonanceError {
    /// Malformed input to a calculus primitive (edge outside the graph,
    /// empty sample, non-finite value).
    #[error("validation error: {0}")]
    Validation(String),

    /// Not enough observations for a stable estimate.
    #[error("insufficient data for {what}: need {needed}, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type ResonanceResult<T> = Result<T, ResonanceError>;
