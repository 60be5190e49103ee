// ─────────────────────────────────────────────────────────────────────
// Resonance — Service Curves
// ─────────────────────────────────────────────────────────────────────
//! Rate-latency service curve and its coherence-weighted extension:
//!
//!   β_{R,T}(t) = R · max(0, t − T)
//!   Δ(u)       = ∫_0^u ln(1 + λ (c(s) − c̄)) ds
//!   β_c(t)     = min_{0 ≤ u ≤ t} [ β(t − u) + Δ(u) ]
//!
//! Δ is positive when coherence stays above the baseline c̄ (effective
//! service boosted) and negative below it (service penalised).

use serde::{Deserialize, Serialize};

/// Nominal rate-latency parameters. Configuration, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLatency {
    /// Service rate R ≥ 0.
    pub rate: f64,
    /// Latency T ≥ 0, in seconds.
    pub latency: f64,
}

/// Coherence observation at time `t` (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceSample {
    pub t: f64,
    /// Coherence c ∈ [0, 1].
    pub c: f64,
}

/// Keeps ln() finite when λ(c − c̄) ≤ −1.
const LOG_ARG_FLOOR: f64 = 1e-12;

pub fn beta_rate_latency(t: f64, params: &RateLatency) -> f64 {
    params.rate * (t - params.latency).max(0.0)
}

fn sorted_by_time(samples: &[CoherenceSample]) -> Vec<CoherenceSample> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.t.total_cmp(&b.t));
    sorted
}

#[inline]
fn log_gain(c: f64, lambda: f64, c_bar: f64) -> f64 {
    (1.0 + lambda * (c - c_bar)).max(LOG_ARG_FLOOR).ln()
}

/// Trapezoidal Δ(u) over samples already sorted by time.
fn integral_sorted(u: f64, sorted: &[CoherenceSample], lambda: f64, c_bar: f64) -> f64 {
    let (first, last) = match (sorted.first(), sorted.last()) {
        (Some(f), Some(l)) if u > 0.0 => (f, l),
        _ => return 0.0,
    };

    let mut acc = 0.0;
    let mut prev_t = 0.0_f64;
    let mut prev_c = first.c;

    for s in sorted {
        if s.t <= 0.0 {
            continue;
        }
        let seg_start = prev_t.max(0.0);
        let seg_end = s.t.min(u);
        if seg_end > seg_start {
            let c_mid = 0.5 * (prev_c + s.c);
            acc += log_gain(c_mid, lambda, c_bar) * (seg_end - seg_start);
        }
        if s.t >= u {
            break;
        }
        prev_t = s.t;
        prev_c = s.c;
    }

    // Hold the last observation constant past the final sample.
    if u > last.t {
        acc += log_gain(last.c, lambda, c_bar) * (u - last.t.max(0.0));
    }
    acc
}

/// Δ(u) ≈ ∫_0^u ln(1 + λ(c(s) − c̄)) ds by the trapezoidal rule.
///
/// Samples need not be sorted. Returns 0 for `u ≤ 0` or no samples.
pub fn coherence_integral_delta(
    u: f64,
    samples: &[CoherenceSample],
    lambda: f64,
    c_bar: f64,
) -> f64 {
    if samples.is_empty() || u <= 0.0 {
        return 0.0;
    }
    integral_sorted(u, &sorted_by_time(samples), lambda, c_bar)
}

/// Coherence-weighted service curve β_c(t), discretised over knots
/// {0, t} ∪ sample times in [0, t] ∪ `extra_knots` in [0, t].
pub fn beta_coherence_weighted(
    t: f64,
    params: &RateLatency,
    samples: &[CoherenceSample],
    lambda: f64,
    c_bar: f64,
    extra_knots: &[f64],
) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }

    let mut knots: Vec<f64> = Vec::with_capacity(samples.len() + extra_knots.len() + 2);
    knots.push(0.0);
    knots.push(t);
    knots.extend(
        samples
            .iter()
            .map(|s| s.t)
            .chain(extra_knots.iter().copied())
            .filter(|k| (0.0..=t).contains(k)),
    );
    knots.sort_by(f64::total_cmp);
    knots.dedup();

    let sorted = sorted_by_time(samples);
    knots
        .iter()
        .map(|&u| beta_rate_latency(t - u, params) + integral_sorted(u, &sorted, lambda, c_bar))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_latency() {
        let p = RateLatency {
            rate: 10.0,
            latency: 1.0,
        };
        assert_eq!(beta_rate_latency(0.5, &p), 0.0);
        assert_eq!(beta_rate_latency(1.0, &p), 0.0);
        assert!((beta_rate_latency(2.0, &p) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_delta_zero_cases() {
        let s = [CoherenceSample { t: 1.0, c: 0.9 }];
        assert_eq!(coherence_integral_delta(0.0, &s, 1.0, 0.5), 0.0);
        assert_eq!(coherence_integral_delta(1.0, &[], 1.0, 0.5), 0.0);
    }

    #[test]
    fn test_delta_sign_follows_baseline() {
        let high = [
            CoherenceSample { t: 0.0, c: 0.9 },
            CoherenceSample { t: 1.0, c: 0.9 },
        ];
        let low = [
            CoherenceSample { t: 0.0, c: 0.1 },
            CoherenceSample { t: 1.0, c: 0.1 },
        ];
        assert!(coherence_integral_delta(2.0, &high, 1.0, 0.5) > 0.0);
        assert!(coherence_integral_delta(2.0, &low, 1.0, 0.5) < 0.0);
    }

    #[test]
    fn test_delta_holds_last_value() {
        // Constant c=0.9 → integrand ln(1.4) everywhere.
        let s = [CoherenceSample { t: 1.0, c: 0.9 }];
        let d = coherence_integral_delta(3.0, &s, 1.0, 0.5);
        assert!((d - 3.0 * 1.4_f64.ln()).abs() < 1e-9, "delta={d}");
    }

    #[test]
    fn test_delta_unsorted_input() {
        let sorted = [
            CoherenceSample { t: 0.5, c: 0.2 },
            CoherenceSample { t: 1.5, c: 0.8 },
        ];
        let shuffled = [sorted[1], sorted[0]];
        let a = coherence_integral_delta(2.0, &sorted, 1.0, 0.5);
        let b = coherence_integral_delta(2.0, &shuffled, 1.0, 0.5);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_curve_orders_by_coherence() {
        let p = RateLatency {
            rate: 100.0,
            latency: 0.5,
        };
        let c_low = [
            CoherenceSample { t: 0.0, c: 0.1 },
            CoherenceSample { t: 1.0, c: 0.2 },
        ];
        let c_high = [
            CoherenceSample { t: 0.0, c: 0.8 },
            CoherenceSample { t: 1.0, c: 0.9 },
        ];
        let t = 2.0;
        let base = beta_rate_latency(t, &p);
        let b_low = beta_coherence_weighted(t, &p, &c_low, 0.8, 0.5, &[]);
        let b_high = beta_coherence_weighted(t, &p, &c_high, 0.8, 0.5, &[]);
        assert!(b_low <= base);
        assert!(b_high >= b_low);
    }

    #[test]
    fn test_weighted_curve_nonpositive_t() {
        let p = RateLatency {
            rate: 1.0,
            latency: 0.0,
        };
        assert_eq!(beta_coherence_weighted(0.0, &p, &[], 1.0, 0.5, &[]), 0.0);
    }

    #[test]
    fn test_weighted_curve_without_samples_equals_nominal_min() {
        // No samples → Δ ≡ 0 → min over {0, t} of β(t − u) = β(0) = 0.
        let p = RateLatency {
            rate: 10.0,
            latency: 0.0,
        };
        assert_eq!(beta_coherence_weighted(2.0, &p, &[], 1.0, 0.5, &[1.0]), 0.0);
    }
}
