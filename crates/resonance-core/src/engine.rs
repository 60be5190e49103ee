// ─────────────────────────────────────────────────────────────────────
// Resonance — Core Orchestrator
// ─────────────────────────────────────────────────────────────────────
//! Owns the controller state and composes the estimator, bridge,
//! coupling law, band controller and actuator executor.
//!
//! Thread-safe: all mutable state sits behind `parking_lot` locks that
//! are released before any `.await`, so a core can be shared as
//! `Arc<ResonanceCore>` across tasks.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use resonance_math::{backlog_bound, BacklogForecaster, CalculusDecision, CoherenceSample};
use resonance_physics::{adapt_k, order_parameter, BandController, SmoothCoupling};
use resonance_spectral::spectral_entropy;
use resonance_types::{
    clamp_score, Actuators, ControllerConfig, ControllerConfigPatch, CoreConfig, Features, Mode,
    RSource, ResonanceBreakdown, ResonanceResult, ResonanceSnapshot, ResonanceState, TaskHint,
};

use crate::actuators::{
    delay_then_invoke, ActuationKind, ActuationLogger, ActuationPlan, ActuationRecord,
};
use crate::bridge::{build_dependency_graph, compute_resonance, ResonanceInputs};
use crate::clock::{Clock, TokioClock};
use crate::histogram::{LatencyHistogram, Percentiles};

/// Receives every published snapshot.
///
/// Called synchronously after the state lock is released; keep it cheap.
pub trait StateObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &ResonanceSnapshot);
}

struct EngineState {
    state: ResonanceState,
    controller: BandController,
    coupling: Option<SmoothCoupling>,
    phases: Vec<f64>,
    history: VecDeque<CoherenceSample>,
    histogram: LatencyHistogram,
    breakdown: Option<ResonanceBreakdown>,
    last_p99_risk: f64,
    use_calculus: bool,
    rng: StdRng,
}

impl EngineState {
    fn snapshot(&self) -> ResonanceSnapshot {
        ResonanceSnapshot {
            state: self.state.clone(),
            breakdown: self.breakdown.clone(),
        }
    }
}

/// What `decide_and_run` resolved to under the state lock.
enum Disposition {
    Untouched,
    Enforce(ActuationPlan),
}

pub struct ResonanceCore {
    config: CoreConfig,
    inner: Mutex<EngineState>,
    actuations: Mutex<ActuationLogger>,
    forecaster: Option<Mutex<BacklogForecaster>>,
    observers: RwLock<Vec<Arc<dyn StateObserver>>>,
    clock: Arc<dyn Clock>,
}

impl ResonanceCore {
    /// Core on tokio timers.
    pub fn new(config: CoreConfig) -> ResonanceResult<Self> {
        Self::with_clock(config, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(config: CoreConfig, clock: Arc<dyn Clock>) -> ResonanceResult<Self> {
        config.validate()?;
        let controller = BandController::new(config.controller.clone());
        Ok(Self::assemble(config, clock, controller, StdRng::from_entropy()))
    }

    /// Deterministic core for tests and replays.
    pub fn with_seed(config: CoreConfig, clock: Arc<dyn Clock>, seed: u64) -> ResonanceResult<Self> {
        config.validate()?;
        let controller = BandController::with_seed(config.controller.clone(), seed);
        let rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        Ok(Self::assemble(config, clock, controller, rng))
    }

    fn assemble(config: CoreConfig, clock: Arc<dyn Clock>, controller: BandController, rng: StdRng) -> Self {
        let k = config
            .initial_k
            .clamp(config.controller.k_min, config.controller.k_max);
        let inner = EngineState {
            state: ResonanceState {
                k,
                mode: config.initial_mode,
                ..Default::default()
            },
            controller,
            coupling: config
                .coupling_smoothing
                .map(|alpha| SmoothCoupling::with_alpha(k, alpha)),
            phases: Vec::new(),
            history: VecDeque::with_capacity(config.calculus.history_capacity),
            histogram: LatencyHistogram::new(),
            breakdown: None,
            last_p99_risk: 0.0,
            use_calculus: config.use_calculus,
            rng,
        };
        let forecaster = config
            .track_backlog
            .then(|| Mutex::new(BacklogForecaster::new()));
        Self {
            config,
            inner: Mutex::new(inner),
            actuations: Mutex::new(ActuationLogger::new()),
            forecaster,
            observers: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Ingest a phase vector and refresh R, entropy and K.
    pub fn update(&self, phases: &[f64], spectral_entropy: f64, p99_risk: f64) -> Features {
        let now = self.clock.now();
        let backlog = self.forecaster.as_ref().map(|f| {
            let (arrival, service) = f.lock().curves(now);
            backlog_bound(&arrival, &service)
        });

        let (features, snapshot) = {
            let mut st = self.inner.lock();
            let r_phase = clamp_score(order_parameter(phases).r, 0.0, 1.0);
            let sigma_theta = 1.0 - r_phase;
            let calc = &self.config.calculus;

            st.phases = phases.to_vec();
            st.history.push_back(CoherenceSample {
                t: now.as_secs_f64(),
                c: r_phase,
            });
            while st.history.len() > calc.history_capacity {
                st.history.pop_front();
            }

            let (r, source) = if st.use_calculus && st.history.len() >= calc.min_history {
                match compute_resonance(&self.calculus_inputs(&st, now)) {
                    Ok(b) => {
                        let r = b.r;
                        if b.is_degraded() {
                            log::debug!("calculus R={r:.4} with degraded components");
                        }
                        st.breakdown = Some(b);
                        (r, RSource::Calculus)
                    }
                    Err(e) => {
                        log::warn!("Resonance Calculus failed, using phase-based R: {e}");
                        (r_phase, RSource::PhaseFallback { reason: e.to_string() })
                    }
                }
            } else {
                (r_phase, RSource::Warmup)
            };

            let spectral_entropy = clamp_score(spectral_entropy, 0.0, 1.0);
            let p99_risk = clamp_score(p99_risk, 0.0, 1.0);
            let (k_min, k_max) = {
                let c = st.controller.config();
                (c.k_min, c.k_max)
            };
            let target_k = adapt_k(st.state.k, sigma_theta, p99_risk, k_min, k_max);
            let k = match st.coupling.as_mut() {
                Some(smooth) => smooth.update(target_k).clamp(k_min, k_max),
                None => target_k,
            };

            st.state.r = r;
            st.state.spectral_entropy = spectral_entropy;
            st.state.k = k;
            st.last_p99_risk = p99_risk;

            let features = Features {
                r,
                spectral_entropy,
                p99_risk,
                sigma_theta,
                backlog_bound: backlog,
                source,
            };
            (features, st.snapshot())
        };

        log::debug!(
            "update: R={:.4} H={:.3} K={:.3} source={:?}",
            features.r,
            features.spectral_entropy,
            snapshot.state.k,
            features.source
        );
        self.publish(&snapshot);
        features
    }

    fn calculus_inputs(&self, st: &EngineState, now: Duration) -> ResonanceInputs {
        let calc = &self.config.calculus;
        let window_start = now.as_secs_f64() - calc.coherence_window_s;
        let recent: Vec<CoherenceSample> = st
            .history
            .iter()
            .filter(|s| s.t >= window_start)
            .map(|s| CoherenceSample {
                t: s.t - window_start,
                c: s.c,
            })
            .collect();
        let coherence_samples = if recent.is_empty() {
            st.history.iter().copied().collect()
        } else {
            recent
        };

        ResonanceInputs {
            coherence_samples,
            tail_samples: st.histogram.tail_samples(calc.tail_sample_count),
            graph_size: st.phases.len().max(1),
            edges: build_dependency_graph(&st.phases, calc.graph_base_delay),
            ..ResonanceInputs::from_config(calc)
        }
    }

    /// [`update`](Self::update) with entropy taken from a magnitude spectrum
    /// of recent request timing.
    pub fn update_with_spectrum(&self, phases: &[f64], magnitudes: &[f64], p99_risk: f64) -> Features {
        self.update(phases, spectral_entropy(magnitudes), p99_risk)
    }

    pub fn record_latency(&self, latency_ms: f64) {
        self.inner.lock().histogram.record_ms(latency_ms);
    }

    /// Decide how to admit `run`, apply the decision, and return its output.
    ///
    /// Observe mode and bypassing hints run the task untouched; shadow mode
    /// records the decision without enforcing it.
    pub async fn decide_and_run<F, Fut, T>(&self, hint: &TaskHint, run: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let disposition = self.decide(hint);

        if let Some(f) = &self.forecaster {
            f.lock().record_arrival(self.clock.now());
        }
        let out = match disposition {
            Disposition::Enforce(plan) if !plan.is_immediate() => {
                delay_then_invoke(&*self.clock, &plan, run).await
            }
            _ => run().await,
        };
        if let Some(f) = &self.forecaster {
            f.lock().record_completion(self.clock.now());
        }
        out
    }

    fn decide(&self, hint: &TaskHint) -> Disposition {
        let now = self.clock.now();
        let mut st = self.inner.lock();
        let mode = st.state.mode;

        if mode == Mode::Observe {
            return Disposition::Untouched;
        }
        if hint.bypasses_controller() {
            let reason = if hint.must_run_now { "must_run_now" } else { "critical" };
            self.record(now, ActuationKind::Bypass, 0.0, hint, reason);
            return Disposition::Untouched;
        }

        let features = Features {
            r: st.state.r,
            spectral_entropy: st.state.spectral_entropy,
            p99_risk: st.last_p99_risk,
            sigma_theta: 1.0 - st.state.r,
            backlog_bound: None,
            source: RSource::Warmup,
        };
        let act = st.controller.decide(&features);

        if mode.enforces() {
            let plan = ActuationPlan::from_actuators(&act, &mut st.rng);
            drop(st);
            self.record_enforced(now, &act, &plan, hint);
            Disposition::Enforce(plan)
        } else {
            drop(st);
            let value = act.micro_delay_ms.unwrap_or(0.0);
            self.record(now, ActuationKind::Shadow, value, hint, "shadow");
            Disposition::Untouched
        }
    }

    fn record_enforced(&self, now: Duration, act: &Actuators, plan: &ActuationPlan, hint: &TaskHint) {
        if !plan.micro_delay.is_zero() {
            self.record(now, ActuationKind::MicroDelay, plan.micro_delay.as_secs_f64() * 1000.0, hint, "over_coherent");
        }
        if !plan.dither_delay.is_zero() {
            self.record(now, ActuationKind::Dither, plan.dither_delay.as_secs_f64() * 1000.0, hint, "over_coherent");
        }
        if let Some(dk) = act.adjust_k {
            self.record(now, ActuationKind::AdjustK, dk, hint, "band_error");
        }
        if let Some(b) = act.batch_size {
            self.record(now, ActuationKind::Batch, f64::from(b), hint, "noisy_entropy");
        }
    }

    fn record(&self, now: Duration, kind: ActuationKind, value: f64, hint: &TaskHint, reason: &str) {
        self.actuations.lock().log(ActuationRecord {
            timestamp: now,
            kind,
            value,
            task_class: hint.task_class.clone(),
            reason: Some(reason.to_string()),
        });
    }

    pub fn get_state(&self) -> ResonanceState {
        self.inner.lock().state.clone()
    }

    pub fn snapshot(&self) -> ResonanceSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn set_mode(&self, mode: Mode) {
        let snapshot = {
            let mut st = self.inner.lock();
            if st.state.mode != mode {
                log::info!("mode {} -> {}", st.state.mode, mode);
            }
            st.state.mode = mode;
            st.snapshot()
        };
        self.publish(&snapshot);
    }

    /// Merge a partial controller configuration; rejected if the result
    /// does not validate. K is re-clamped into the new bounds.
    pub fn update_config(&self, patch: &ControllerConfigPatch) -> ResonanceResult<()> {
        let mut st = self.inner.lock();
        let mut merged = st.controller.config().clone();
        merged.merge(patch);
        merged.validate()?;
        st.controller.update_config(patch);
        st.state.k = st.state.k.clamp(merged.k_min, merged.k_max);
        Ok(())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        self.inner.lock().controller.config().clone()
    }

    /// Clear the integrator, phases, coherence history, histogram and
    /// backlog; K and mode are kept.
    pub fn reset(&self) {
        {
            let mut st = self.inner.lock();
            st.controller.reset();
            st.phases.clear();
            st.history.clear();
            st.histogram.reset();
            st.breakdown = None;
        }
        if let Some(f) = &self.forecaster {
            f.lock().reset();
        }
        log::info!("resonance core reset");
    }

    pub fn set_use_calculus(&self, enable: bool) {
        self.inner.lock().use_calculus = enable;
    }

    pub fn subscribe(&self, observer: Arc<dyn StateObserver>) {
        self.observers.write().push(observer);
    }

    /// Observers are called with the registry unlocked, so they may
    /// `subscribe` from inside `on_snapshot`.
    fn publish(&self, snapshot: &ResonanceSnapshot) {
        let observers: Vec<Arc<dyn StateObserver>> = self.observers.read().clone();
        for obs in &observers {
            obs.on_snapshot(snapshot);
        }
    }

    pub fn latency_percentiles(&self) -> Percentiles {
        self.inner.lock().histogram.percentiles()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn actuation_records(&self) -> Vec<ActuationRecord> {
        self.actuations.lock().records()
    }

    pub fn recent_actuations(&self, kind: ActuationKind, window: Duration) -> usize {
        self.actuations
            .lock()
            .recent_count(kind, window, self.clock.now())
    }

    /// Backlog-based decision, when backlog tracking is enabled.
    pub fn forecast(&self, defer_budget_ms: f64, hedge_threshold_ms: f64) -> Option<CalculusDecision> {
        let now = self.clock.now();
        self.forecaster
            .as_ref()
            .map(|f| f.lock().decide(defer_budget_ms, hedge_threshold_ms, now))
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}
