// ─────────────────────────────────────────────────────────────────────
// Resonance — Generalized Pareto Tail Estimation
// ─────────────────────────────────────────────────────────────────────
//! Extreme-value tail model for latency exceedances y = X − u > 0.
//!
//! Fit via Hosking probability-weighted moments on ordered exceedances:
//!
//!   b0 = mean(y),  b1 = (1/n) Σ_i (i/(n−1)) · y_(i)    (i zero-based)
//!   L1 = b0,       L2 = 2·b1 − b0
//!   ξ  = 2·L2 / (L1 − 2·L2),   σ = L1 · (1 − ξ)
//!
//! When L1 − 2·L2 ≤ 1e−12 the fit falls back to a method-of-moments
//! estimate with ξ clamped to [−0.5, 1.5]. The clamp bounds are an
//! unverified heuristic kept for behavioural compatibility.

use serde::{Deserialize, Serialize};

use resonance_types::{ResonanceError, ResonanceResult};

/// Minimum exceedance count for a PWM fit.
pub const MIN_EXCEEDANCES: usize = 10;

const DEGENERATE_DENOM: f64 = 1e-12;
const SIGMA_FLOOR: f64 = 1e-9;
const XI_ZERO: f64 = 1e-9;
const FALLBACK_XI_MIN: f64 = -0.5;
const FALLBACK_XI_MAX: f64 = 1.5;

/// Fitted GPD, valid for one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpdParams {
    /// Shape ξ.
    pub xi: f64,
    /// Scale σ > 0.
    pub sigma: f64,
    /// Threshold u.
    pub threshold: f64,
    /// Empirical P(X > u).
    pub tail_frac: f64,
}

/// Probability-weighted moments (b0, b1) of an ascending sample.
pub fn pwm_moments(sorted: &[f64]) -> ResonanceResult<(f64, f64)> {
    let n = sorted.len();
    if n == 0 {
        return Err(ResonanceError::Validation("empty sample".to_string()));
    }
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let (sum, wsum) = sorted
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(s, ws), (i, &x)| {
            let w = if n > 1 { i as f64 / denom } else { 0.0 };
            (s + x, ws + w * x)
        });
    Ok((sum / n as f64, wsum / n as f64))
}

/// Fit a GPD to threshold exceedances.
///
/// Fails with `InsufficientData` below [`MIN_EXCEEDANCES`] and with
/// `Validation` on non-finite input.
pub fn fit_gpd_pwm(exceedances: &[f64], threshold: f64, tail_frac: f64) -> ResonanceResult<GpdParams> {
    if exceedances.len() < MIN_EXCEEDANCES {
        return Err(ResonanceError::InsufficientData {
            what: "GPD exceedances",
            needed: MIN_EXCEEDANCES,
            got: exceedances.len(),
        });
    }
    if exceedances.iter().any(|x| !x.is_finite()) {
        return Err(ResonanceError::Validation(
            "exceedances contain NaN or Inf".to_string(),
        ));
    }

    let mut sorted = exceedances.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (b0, b1) = pwm_moments(&sorted)?;
    let l1 = b0;
    let l2 = 2.0 * b1 - b0;
    let denom = l1 - 2.0 * l2;

    if denom <= DEGENERATE_DENOM {
        let mean = l1;
        let m2 = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
            / (sorted.len() - 1).max(1) as f64;
        let m2 = if m2 == 0.0 { DEGENERATE_DENOM } else { m2 };
        let xi = (0.5 * (1.0 - mean * mean / m2)).clamp(FALLBACK_XI_MIN, FALLBACK_XI_MAX);
        let sigma = (mean * (1.0 - xi)).max(SIGMA_FLOOR);
        log::debug!("GPD PWM denominator degenerate ({denom:.3e}); MoM fallback xi={xi:.4}");
        return Ok(GpdParams {
            xi,
            sigma,
            threshold,
            tail_frac,
        });
    }

    let xi = 2.0 * l2 / denom;
    let sigma = (l1 * (1.0 - xi)).max(SIGMA_FLOOR);
    Ok(GpdParams {
        xi,
        sigma,
        threshold,
        tail_frac,
    })
}

/// Survival S(y) = (1 + ξy/σ)^(−1/ξ), or exp(−y/σ) as ξ → 0.
pub fn gpd_survival(y: f64, params: &GpdParams) -> f64 {
    if y < 0.0 {
        return 1.0;
    }
    let GpdParams { xi, sigma, .. } = *params;
    if xi.abs() < XI_ZERO {
        return (-y / sigma).exp();
    }
    let z = 1.0 + xi * y / sigma;
    if z <= 0.0 {
        return 0.0;
    }
    z.powf(-1.0 / xi)
}

/// Excess quantile Q(p) = σ/ξ · ((1 − p)^(−ξ) − 1), or −σ ln(1 − p).
pub fn gpd_exceedance_quantile(p: f64, params: &GpdParams) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let GpdParams { xi, sigma, .. } = *params;
    if xi.abs() < XI_ZERO {
        return -sigma * (1.0 - p).ln();
    }
    sigma / xi * ((1.0 - p).powf(-xi) - 1.0)
}

/// Quantile of the underlying variable at probability `q`.
///
/// Below the tail (`q ≤ 1 − τ`) the threshold is returned as a floor;
/// `τ ≤ 0` yields +∞.
pub fn tail_quantile_from_gpd(q: f64, params: &GpdParams) -> f64 {
    let u = params.threshold;
    let tau = params.tail_frac;
    if tau <= 0.0 {
        return f64::INFINITY;
    }
    if q <= 1.0 - tau {
        return u;
    }
    let p_tail = (q - (1.0 - tau)) / tau;
    u + gpd_exceedance_quantile(p_tail, params)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn exponential(n: usize, mean: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| -mean * (1.0 - rng.gen::<f64>()).ln())
            .collect()
    }

    #[test]
    fn test_pwm_moments_basic() {
        let (b0, b1) = pwm_moments(&[1.0, 2.0, 3.0]).unwrap();
        assert!((b0 - 2.0).abs() < 1e-12);
        // weights 0, 0.5, 1 → (0 + 1 + 3) / 3
        assert!((b1 - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pwm_moments_empty() {
        assert!(pwm_moments(&[]).is_err());
    }

    #[test]
    fn test_fit_requires_ten_exceedances() {
        let err = fit_gpd_pwm(&[1.0; 9], 100.0, 0.05).unwrap_err();
        assert!(matches!(
            err,
            ResonanceError::InsufficientData { needed: 10, got: 9, .. }
        ));
    }

    #[test]
    fn test_fit_rejects_nan() {
        let mut ys = vec![1.0; 12];
        ys[3] = f64::NAN;
        assert!(matches!(
            fit_gpd_pwm(&ys, 0.0, 0.1),
            Err(ResonanceError::Validation(_))
        ));
    }

    #[test]
    fn test_exponential_tail_quantile_above_threshold() {
        let threshold = 200.0;
        let ys = exponential(300, 50.0, 7);
        let params = fit_gpd_pwm(&ys, threshold, 0.05).unwrap();
        let q99 = tail_quantile_from_gpd(0.99, &params);
        assert!(q99 > threshold, "q99={q99}");
    }

    #[test]
    fn test_constant_exceedances_fit_exponential() {
        // All equal → L2 = 0 → denom = L1 > 0 → ξ = 0, σ = mean.
        let params = fit_gpd_pwm(&[5.0; 20], 10.0, 0.1).unwrap();
        assert!(params.xi.abs() < 1e-12);
        assert!((params.sigma - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_denominator_clamps_xi() {
        // Heavy spread: L2 large relative to L1 → denominator ≤ 0.
        let mut ys = vec![0.0; 15];
        ys.push(1000.0);
        let params = fit_gpd_pwm(&ys, 0.0, 0.2).unwrap();
        assert!((FALLBACK_XI_MIN..=FALLBACK_XI_MAX).contains(&params.xi));
        assert!(params.sigma >= SIGMA_FLOOR);
    }

    #[test]
    fn test_survival_limits() {
        let p = GpdParams {
            xi: 0.0,
            sigma: 2.0,
            threshold: 0.0,
            tail_frac: 0.1,
        };
        assert_eq!(gpd_survival(-1.0, &p), 1.0);
        assert!((gpd_survival(2.0, &p) - (-1.0_f64).exp()).abs() < 1e-12);

        let bounded = GpdParams { xi: -1.0, ..p };
        assert_eq!(gpd_survival(10.0, &bounded), 0.0);
    }

    #[test]
    fn test_quantile_inverts_survival() {
        let p = GpdParams {
            xi: 0.3,
            sigma: 4.0,
            threshold: 0.0,
            tail_frac: 0.1,
        };
        let y = gpd_exceedance_quantile(0.9, &p);
        assert!((gpd_survival(y, &p) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_exceedance_quantile_edges() {
        let p = GpdParams {
            xi: 0.2,
            sigma: 1.0,
            threshold: 0.0,
            tail_frac: 0.1,
        };
        assert_eq!(gpd_exceedance_quantile(0.0, &p), 0.0);
        assert!(gpd_exceedance_quantile(1.0, &p).is_infinite());
    }

    #[test]
    fn test_tail_quantile_floor_and_infinite() {
        let p = GpdParams {
            xi: 0.1,
            sigma: 1.0,
            threshold: 42.0,
            tail_frac: 0.05,
        };
        assert_eq!(tail_quantile_from_gpd(0.9, &p), 42.0);
        let none = GpdParams { tail_frac: 0.0, ..p };
        assert!(tail_quantile_from_gpd(0.99, &none).is_infinite());
    }
}
