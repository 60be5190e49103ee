// ─────────────────────────────────────────────────────────────────────
// Resonance — Task Hints, Actuators and Client Policies
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ResonanceError, ResonanceResult};

/// Caller-declared importance of a unit of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseAffinity {
    Align,
    Avoid,
}

/// Per-call task descriptor supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskHint {
    pub id: String,
    pub importance: Importance,
    pub soft_deadline_ms: Option<f64>,
    pub can_batch: bool,
    pub max_batch_latency_ms: Option<f64>,
    pub max_deferral_ms: Option<f64>,
    pub must_run_now: bool,
    pub phase_affinity: Option<PhaseAffinity>,
    pub task_class: Option<String>,
    pub idempotent: bool,
}

impl TaskHint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn must_run_now(mut self, must: bool) -> Self {
        self.must_run_now = must;
        self
    }

    /// Critical and must-run-now tasks skip the controller entirely.
    pub fn bypasses_controller(&self) -> bool {
        self.must_run_now || self.importance == Importance::Critical
    }
}

/// Controller decision for one task.
///
/// `batch_size` and `adjust_k` are advisory for callers; the executor
/// only applies the delays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actuators {
    pub micro_delay_ms: Option<f64>,
    pub batch_size: Option<u32>,
    pub dither: Option<f64>,
    pub adjust_k: Option<f64>,
}

impl Actuators {
    /// True when nothing would change the task's timing.
    pub fn is_noop(&self) -> bool {
        self.micro_delay_ms.map_or(true, |d| d <= 0.0) && self.dither.map_or(true, |d| d <= 0.0)
    }
}

/// Hedged-request policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    /// Delay before the duplicate fires.
    pub delay_ms: u64,
    pub max_inflight_pct: f64,
    pub cancel_on_first: bool,
    /// Skip hedging for tasks not marked idempotent.
    pub idempotent_only: bool,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            max_inflight_pct: 5.0,
            cancel_on_first: false,
            idempotent_only: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
    #[default]
    FullJitter,
}

/// Token bucket parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Tokens added per second.
    pub refill_rate: f64,
    pub capacity: f64,
    pub local_only: bool,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            refill_rate: 10.0,
            capacity: 100.0,
            local_only: true,
        }
    }
}

/// Retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub strategy: BackoffStrategy,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    /// When set, attempts are gated by the client's token bucket.
    pub token_bucket: Option<TokenBucketConfig>,
}

impl RetryConfig {
    /// At least one attempt is required.
    pub fn validate(&self) -> ResonanceResult<()> {
        if self.max_attempts == 0 {
            return Err(ResonanceError::Config(
                "max_attempts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::FullJitter,
            base_delay_ms: 10,
            max_delay_ms: 1000,
            max_attempts: 3,
            token_bucket: None,
        }
    }
}
