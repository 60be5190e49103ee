// ─────────────────────────────────────────────────────────────────────
// Resonance — Resonance Bridge
// ─────────────────────────────────────────────────────────────────────
//! Turns live engine state into calculus inputs and fuses the three
//! component scores into R:
//!
//!   coherence = clamp(β_c(t) / β(t), 0, 1)
//!   tail      = clamp(u / q̂₉₉, 0, 1) from a GPD fit above u
//!   timing    = clamp(1 / (1 + λ), 0, 1), λ = max cycle mean
//!
//! Insufficient data and fit failures degrade a component to a flagged
//! neutral score. A malformed graph is an input error and is returned.

use resonance_math::{
    aggregate_resonance, beta_coherence_weighted, beta_rate_latency, build_weight_matrix,
    fit_gpd_pwm, max_cycle_mean_karp, tail_quantile_from_gpd, CoherenceSample, GraphEdge,
    RateLatency, ResonanceComponents, MIN_EXCEEDANCES,
};
use resonance_types::{
    CalculusConfig, ComponentScore, FallbackReason, ResonanceBreakdown, ResonanceResult,
    ResonanceWeights,
};

use crate::histogram::TailSample;

/// Minimum tail samples before a threshold is picked.
pub const MIN_TAIL_SAMPLES: usize = 50;
const TAIL_QUANTILE: f64 = 0.99;

/// Everything one calculus cycle needs.
#[derive(Debug, Clone)]
pub struct ResonanceInputs {
    pub horizon_s: f64,
    pub rate_latency: RateLatency,
    pub coherence_lambda: f64,
    pub coherence_baseline: f64,
    pub coherence_samples: Vec<CoherenceSample>,
    pub tail_samples: Vec<TailSample>,
    pub tail_threshold_quantile: f64,
    pub graph_size: usize,
    pub edges: Vec<GraphEdge>,
    pub weights: ResonanceWeights,
}

impl ResonanceInputs {
    /// Inputs with the fixed parameters taken from `cfg`.
    pub fn from_config(cfg: &CalculusConfig) -> Self {
        Self {
            horizon_s: cfg.horizon_s,
            rate_latency: RateLatency {
                rate: cfg.service_rate,
                latency: cfg.service_latency_s,
            },
            coherence_lambda: cfg.coherence_lambda,
            coherence_baseline: cfg.coherence_baseline,
            coherence_samples: Vec::new(),
            tail_samples: Vec::new(),
            tail_threshold_quantile: cfg.tail_threshold_quantile,
            graph_size: 0,
            edges: Vec::new(),
            weights: cfg.weights,
        }
    }
}

fn coherence_score(inputs: &ResonanceInputs) -> ComponentScore {
    let nominal = beta_rate_latency(inputs.horizon_s, &inputs.rate_latency);
    if nominal <= 0.0 {
        return ComponentScore::value_or(0.0, FallbackReason::NonPositiveNominal);
    }
    let weighted = beta_coherence_weighted(
        inputs.horizon_s,
        &inputs.rate_latency,
        &inputs.coherence_samples,
        inputs.coherence_lambda,
        inputs.coherence_baseline,
        &[],
    );
    ComponentScore::computed(weighted / nominal)
}

fn tail_health_score(samples: &[TailSample], quantile: f64) -> ComponentScore {
    let n = samples.len();
    if n < MIN_TAIL_SAMPLES {
        return ComponentScore::neutral(FallbackReason::InsufficientSamples {
            needed: MIN_TAIL_SAMPLES,
            got: n,
        });
    }

    let mut values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    values.sort_by(f64::total_cmp);
    let idx = ((quantile * n as f64).floor() as usize).min(n - 1);
    let threshold = values[idx];
    let exceedances: Vec<f64> = values
        .iter()
        .filter(|&&x| x > threshold)
        .map(|x| x - threshold)
        .collect();

    if exceedances.len() < MIN_EXCEEDANCES {
        return ComponentScore::neutral(FallbackReason::InsufficientExceedances {
            needed: MIN_EXCEEDANCES,
            got: exceedances.len(),
        });
    }

    let tail_frac = exceedances.len() as f64 / n as f64;
    match fit_gpd_pwm(&exceedances, threshold, tail_frac) {
        Ok(params) => {
            let q99 = tail_quantile_from_gpd(TAIL_QUANTILE, &params);
            let ratio = if q99 <= 0.0 { 1.0 } else { threshold / q99 };
            if ratio.is_nan() {
                return ComponentScore::neutral(FallbackReason::FitFailed {
                    message: format!("non-finite tail ratio (q99={q99})"),
                });
            }
            ComponentScore::computed(ratio)
        }
        Err(e) => {
            log::warn!("GPD fit failed, tail score neutral: {e}");
            ComponentScore::neutral(FallbackReason::FitFailed {
                message: e.to_string(),
            })
        }
    }
}

/// (timing score, λ). λ is 0 when the graph is empty.
fn timing_score(graph_size: usize, edges: &[GraphEdge]) -> ResonanceResult<(ComponentScore, f64)> {
    if graph_size == 0 || edges.is_empty() {
        return Ok((ComponentScore::neutral(FallbackReason::EmptyGraph), 0.0));
    }
    let w = build_weight_matrix(graph_size, edges)?;
    let lambda = max_cycle_mean_karp(&w).lambda;
    let raw = if lambda > 0.0 { 1.0 / (1.0 + lambda) } else { 1.0 };
    let lambda_res = if lambda.is_finite() { lambda } else { 0.0 };
    Ok((ComponentScore::computed(raw), lambda_res))
}

/// One Resonance-Calculus cycle.
///
/// Fails only with `Validation` when an edge references a node outside
/// `graph_size` or carries a non-finite weight.
pub fn compute_resonance(inputs: &ResonanceInputs) -> ResonanceResult<ResonanceBreakdown> {
    let coherence = coherence_score(inputs);
    let tail_health = tail_health_score(&inputs.tail_samples, inputs.tail_threshold_quantile);
    let (timing, lambda_res) = timing_score(inputs.graph_size, &inputs.edges)?;

    let r = aggregate_resonance(
        &ResonanceComponents {
            coherence: coherence.value,
            tail_health: tail_health.value,
            timing: timing.value,
        },
        &inputs.weights,
    );

    Ok(ResonanceBreakdown {
        r,
        lambda_res,
        coherence,
        tail_health,
        timing,
    })
}

/// Ring plus reverse ring over the phase vector.
///
/// w(i→j) = base · (2 − |cos(θ_i − θ_j)|): aligned neighbours cost less.
pub fn build_dependency_graph(phases: &[f64], base_delay: f64) -> Vec<GraphEdge> {
    let n = phases.len();
    if n == 0 {
        return Vec::new();
    }
    let weight = |i: usize, j: usize| base_delay * (2.0 - (phases[i] - phases[j]).cos().abs());
    let forward = (0..n).map(|i| {
        let next = (i + 1) % n;
        GraphEdge {
            u: i,
            v: next,
            w: weight(i, next),
        }
    });
    let reverse = (0..n).map(|i| {
        let prev = (i + n - 1) % n;
        GraphEdge {
            u: i,
            v: prev,
            w: weight(i, prev),
        }
    });
    forward.chain(reverse).collect()
}
