// ─────────────────────────────────────────────────────────────────────
// Resonance — Network-Calculus Bounds and Backlog Forecaster
// ─────────────────────────────────────────────────────────────────────
//! Discrete arrival/service curves as per-bin counts.
//!
//!   (α ⊗ β)(t) = max_{0≤s≤t} α(s) + β(t − s)
//!   (α ⊘ β)(t) = min_{s≥t}   α(s) − β(s − t)
//!   backlog    = max(0, max_t α(t) − β(t))
//!
//! Missing entries in the shorter curve read as 0.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[inline]
fn at(curve: &[f64], i: usize) -> f64 {
    curve.get(i).copied().unwrap_or(0.0)
}

pub fn max_plus_convolve(alpha: &[f64], beta: &[f64]) -> Vec<f64> {
    let len = alpha.len().max(beta.len());
    (0..len)
        .map(|t| {
            (0..=t)
                .map(|s| at(alpha, s) + at(beta, t - s))
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect()
}

pub fn min_plus_deconvolve(alpha: &[f64], beta: &[f64]) -> Vec<f64> {
    let len = alpha.len().max(beta.len());
    (0..len)
        .map(|t| {
            (t..len)
                .map(|s| at(alpha, s) - at(beta, s - t))
                .fold(f64::INFINITY, f64::min)
        })
        .collect()
}

pub fn backlog_bound(arrivals: &[f64], service: &[f64]) -> f64 {
    arrivals
        .iter()
        .enumerate()
        .map(|(t, a)| a - at(service, t))
        .fold(0.0, f64::max)
}

/// Delay estimate: backlog / mean service per bin, scaled to the window.
/// Returns 0 when the service curve is empty or sums to zero.
pub fn delay_bound(arrivals: &[f64], service: &[f64], window_ms: f64) -> f64 {
    let total: f64 = service.iter().sum();
    if service.is_empty() || total == 0.0 {
        return 0.0;
    }
    let mean_rate = total / service.len() as f64;
    (backlog_bound(arrivals, service) / mean_rate * window_ms).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculusAction {
    Execute,
    Defer,
    Hedge,
}

impl fmt::Display for CalculusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CalculusAction::Execute => "execute",
            CalculusAction::Defer => "defer",
            CalculusAction::Hedge => "hedge",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculusDecision {
    pub action: CalculusAction,
    pub reason: String,
    pub bound_ms: f64,
    pub backlog: f64,
}

const FORECAST_WINDOW: Duration = Duration::from_millis(1000);
const FORECAST_BINS: usize = 10;
const FORECAST_MAX_SAMPLES: usize = 1000;

/// Sliding-window arrival/completion recorder.
///
/// Instants are offsets from an arbitrary epoch supplied by the caller's
/// clock; each series keeps only its newest 1000 entries.
#[derive(Debug, Clone, Default)]
pub struct BacklogForecaster {
    arrivals: VecDeque<Duration>,
    completions: VecDeque<Duration>,
}

impl BacklogForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self, at: Duration) {
        push_bounded(&mut self.arrivals, at);
    }

    pub fn record_completion(&mut self, at: Duration) {
        push_bounded(&mut self.completions, at);
    }

    /// Binned (arrival, service) curves over the last second.
    pub fn curves(&self, now: Duration) -> (Vec<f64>, Vec<f64>) {
        (
            sliding_window(&self.arrivals, now),
            sliding_window(&self.completions, now),
        )
    }

    /// Hedge above `hedge_threshold_ms`, defer above half the budget,
    /// execute otherwise.
    pub fn decide(&self, defer_budget_ms: f64, hedge_threshold_ms: f64, now: Duration) -> CalculusDecision {
        let (arrival, service) = self.curves(now);
        let backlog = backlog_bound(&arrival, &service);
        let bound_ms = delay_bound(&arrival, &service, FORECAST_WINDOW.as_secs_f64() * 1000.0);

        let (action, reason) = if bound_ms > hedge_threshold_ms {
            (
                CalculusAction::Hedge,
                format!("high backlog bound {bound_ms:.1}ms > {hedge_threshold_ms}ms"),
            )
        } else if bound_ms > defer_budget_ms / 2.0 {
            (
                CalculusAction::Defer,
                format!("backlog {bound_ms:.1}ms allows safe deferral within {defer_budget_ms}ms"),
            )
        } else {
            (CalculusAction::Execute, "normal backlog".to_string())
        };

        CalculusDecision {
            action,
            reason,
            bound_ms,
            backlog,
        }
    }

    pub fn reset(&mut self) {
        self.arrivals.clear();
        self.completions.clear();
    }
}

fn push_bounded(series: &mut VecDeque<Duration>, at: Duration) {
    series.push_back(at);
    while series.len() > FORECAST_MAX_SAMPLES {
        series.pop_front();
    }
}

/// Counts per bin over [now − window, now]; the last bin is closed so an
/// event stamped exactly `now` is counted.
fn sliding_window(series: &VecDeque<Duration>, now: Duration) -> Vec<f64> {
    let mut bins = vec![0.0; FORECAST_BINS];
    let start = now.saturating_sub(FORECAST_WINDOW);
    let span = now - start;
    if span.is_zero() {
        return bins;
    }
    for &ts in series {
        if ts < start || ts > now {
            continue;
        }
        let frac = (ts - start).as_secs_f64() / span.as_secs_f64();
        let idx = ((frac * FORECAST_BINS as f64) as usize).min(FORECAST_BINS - 1);
        bins[idx] += 1.0;
    }
    bins
}
