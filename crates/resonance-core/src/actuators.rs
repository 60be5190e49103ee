// ─────────────────────────────────────────────────────────────────────
// Resonance — Actuator Executor
// ─────────────────────────────────────────────────────────────────────
//! Controller decisions become an [`ActuationPlan`] of concrete delays,
//! drawn while the engine state is locked; the plan is then executed by
//! [`delay_then_invoke`] on an injectable [`Clock`] with no lock held.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use resonance_types::Actuators;

use crate::clock::{duration_from_ms, Clock};

/// A positive dither d adds up to 5·d ms of random delay.
pub const DITHER_SCALE_MS: f64 = 5.0;

/// Concrete delays to apply before a task runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuationPlan {
    pub micro_delay: Duration,
    pub dither_delay: Duration,
}

impl ActuationPlan {
    /// Resolve the random parts of `act`.
    ///
    /// Negative dither is an immediate coherent pulse: no delay.
    pub fn from_actuators<R: Rng + ?Sized>(act: &Actuators, rng: &mut R) -> Self {
        let micro_delay = act.micro_delay_ms.map_or(Duration::ZERO, duration_from_ms);
        let dither_delay = match act.dither {
            Some(d) if d > 0.0 => duration_from_ms(rng.gen::<f64>() * d.abs() * DITHER_SCALE_MS),
            _ => Duration::ZERO,
        };
        Self {
            micro_delay,
            dither_delay,
        }
    }

    pub fn total(&self) -> Duration {
        self.micro_delay.saturating_add(self.dither_delay)
    }

    pub fn is_immediate(&self) -> bool {
        self.total().is_zero()
    }
}

/// Sleep the micro-delay, then the dither delay, then run the task.
pub async fn delay_then_invoke<C, F, Fut, T>(clock: &C, plan: &ActuationPlan, run: F) -> T
where
    C: Clock + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if !plan.micro_delay.is_zero() {
        clock.sleep(plan.micro_delay).await;
    }
    if !plan.dither_delay.is_zero() {
        clock.sleep(plan.dither_delay).await;
    }
    run().await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationKind {
    MicroDelay,
    Batch,
    Dither,
    AdjustK,
    Bypass,
    /// Decision computed in shadow mode and not enforced.
    Shadow,
}

impl fmt::Display for ActuationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActuationKind::MicroDelay => "microdelay",
            ActuationKind::Batch => "batch",
            ActuationKind::Dither => "dither",
            ActuationKind::AdjustK => "adjust_k",
            ActuationKind::Bypass => "bypass",
            ActuationKind::Shadow => "shadow",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationRecord {
    /// Clock time of the decision.
    pub timestamp: Duration,
    pub kind: ActuationKind,
    pub value: f64,
    pub task_class: Option<String>,
    pub reason: Option<String>,
}

pub const ACTUATION_LOG_CAPACITY: usize = 1000;

/// Ring buffer of the most recent actuation records.
#[derive(Debug, Clone)]
pub struct ActuationLogger {
    records: VecDeque<ActuationRecord>,
    capacity: usize,
}

impl Default for ActuationLogger {
    fn default() -> Self {
        Self::with_capacity(ACTUATION_LOG_CAPACITY)
    }
}

impl ActuationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(ACTUATION_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&mut self, record: ActuationRecord) {
        log::debug!(
            "actuation {} value={:.3} class={:?}",
            record.kind,
            record.value,
            record.task_class
        );
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn records(&self) -> Vec<ActuationRecord> {
        self.records.iter().cloned().collect()
    }

    /// Records of `kind` stamped within `window` before `now`.
    pub fn recent_count(&self, kind: ActuationKind, window: Duration, now: Duration) -> usize {
        let cutoff = now.saturating_sub(window);
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.timestamp >= cutoff)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::clock::ManualClock;

    fn record(kind: ActuationKind, at_ms: u64) -> ActuationRecord {
        ActuationRecord {
            timestamp: Duration::from_millis(at_ms),
            kind,
            value: 1.0,
            task_class: None,
            reason: None,
        }
    }

    #[test]
    fn test_plan_from_actuators() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let plan = ActuationPlan::from_actuators(
                &Actuators {
                    micro_delay_ms: Some(4.0),
                    dither: Some(0.8),
                    ..Default::default()
                },
                &mut rng,
            );
            assert_eq!(plan.micro_delay, Duration::from_millis(4));
            assert!(plan.dither_delay <= Duration::from_millis(4));
        }
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = ActuationPlan::from_actuators(
            &Actuators {
                micro_delay_ms: Some(1e300),
                dither: Some(1.0),
                ..Default::default()
            },
            &mut rng,
        );
        assert_eq!(plan.micro_delay, Duration::MAX);
        assert_eq!(plan.total(), Duration::MAX);
    }

    #[test]
    fn test_negative_dither_is_immediate() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = ActuationPlan::from_actuators(
            &Actuators {
                dither: Some(-0.9),
                ..Default::default()
            },
            &mut rng,
        );
        assert!(plan.is_immediate());
    }

    #[tokio::test]
    async fn test_delay_then_invoke_sleeps_before_running() {
        let clock = ManualClock::new();
        let plan = ActuationPlan {
            micro_delay: Duration::from_millis(3),
            dither_delay: Duration::from_millis(2),
        };
        let seen = delay_then_invoke(&clock, &plan, || async { clock.now() }).await;
        assert_eq!(seen, Duration::from_millis(5));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_immediate_plan_never_sleeps() {
        let clock = ManualClock::new();
        let out = delay_then_invoke(&clock, &ActuationPlan::default(), || async { 42 }).await;
        assert_eq!(out, 42);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_logger_bounded() {
        let mut log = ActuationLogger::new();
        for i in 0..1500 {
            log.log(record(ActuationKind::MicroDelay, i));
        }
        assert_eq!(log.len(), ACTUATION_LOG_CAPACITY);
        assert_eq!(log.records()[0].timestamp, Duration::from_millis(500));
    }

    #[test]
    fn test_recent_count_window() {
        let mut log = ActuationLogger::new();
        log.log(record(ActuationKind::Bypass, 1_000));
        log.log(record(ActuationKind::Bypass, 50_000));
        log.log(record(ActuationKind::Dither, 55_000));
        let now = Duration::from_millis(60_000);
        assert_eq!(log.recent_count(ActuationKind::Bypass, Duration::from_secs(30), now), 1);
        assert_eq!(log.recent_count(ActuationKind::Bypass, Duration::from_secs(60), now), 2);
        assert_eq!(log.recent_count(ActuationKind::Batch, Duration::from_secs(60), now), 0);
        log.clear();
        assert!(log.is_empty());
    }
}
