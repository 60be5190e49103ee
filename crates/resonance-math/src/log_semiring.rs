// ─────────────────────────────────────────────────────────────────────
// Resonance — Log-Domain Semiring
// ─────────────────────────────────────────────────────────────────────
//! ⊕ = log-sum-exp, ⊗ = +; zero = −∞, one = 0. Used to accumulate
//! probabilities without underflow.

pub const LOG_ZERO: f64 = f64::NEG_INFINITY;
pub const LOG_ONE: f64 = 0.0;

#[inline]
pub fn log_mul(a: f64, b: f64) -> f64 {
    a + b
}

/// ln(eᵃ + eᵇ), stable for large magnitudes.
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == LOG_ZERO {
        return b;
    }
    if b == LOG_ZERO {
        return a;
    }
    a.max(b) + (-(a - b).abs()).exp().ln_1p()
}

/// Viterbi-style hard max.
#[inline]
pub fn log_max(a: f64, b: f64) -> f64 {
    a.max(b)
}

pub fn log_sum(values: &[f64]) -> f64 {
    values.iter().copied().fold(LOG_ZERO, log_add_exp)
}

pub fn to_log_domain(p: f64) -> f64 {
    if p <= 0.0 {
        LOG_ZERO
    } else {
        p.ln()
    }
}

pub fn from_log_domain(log_p: f64) -> f64 {
    if log_p == LOG_ZERO {
        0.0
    } else {
        log_p.exp()
    }
}

/// Log-probabilities of softmax(logits).
pub fn log_softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(LOG_ZERO, f64::max);
    if !max.is_finite() {
        return logits.to_vec();
    }
    let norm = logits.iter().map(|x| (x - max).exp()).sum::<f64>().ln();
    logits.iter().map(|x| x - max - norm).collect()
}

/// ln(α·p₁ + (1 − α)·p₂) from log p₁, log p₂.
pub fn log_blend(log_p1: f64, log_p2: f64, alpha: f64) -> f64 {
    log_add_exp(
        to_log_domain(alpha) + log_p1,
        to_log_domain(1.0 - alpha) + log_p2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_add_exp_matches_direct() {
        let v = log_add_exp(0.2f64.ln(), 0.3f64.ln());
        assert!((v.exp() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_log_add_exp_identity() {
        assert_eq!(log_add_exp(LOG_ZERO, -2.0), -2.0);
        assert_eq!(log_add_exp(LOG_ZERO, LOG_ZERO), LOG_ZERO);
        assert_eq!(log_mul(-2.0, LOG_ONE), -2.0);
    }

    #[test]
    fn test_log_add_exp_large_values() {
        let v = log_add_exp(1000.0, 1000.0);
        assert!((v - (1000.0 + 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_log_sum_empty() {
        assert_eq!(log_sum(&[]), LOG_ZERO);
        assert!((log_sum(&[0.0; 4]) - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_normalizes() {
        let lp = log_softmax(&[1.0, 2.0, 3.0]);
        let total: f64 = lp.iter().map(|x| x.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(log_softmax(&[]).is_empty());
    }

    #[test]
    fn test_domain_conversion() {
        assert_eq!(to_log_domain(0.0), LOG_ZERO);
        assert_eq!(from_log_domain(LOG_ZERO), 0.0);
        assert!((from_log_domain(to_log_domain(0.25)) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_blend() {
        let v = log_blend(0.4f64.ln(), 0.8f64.ln(), 0.5);
        assert!((v.exp() - 0.6).abs() < 1e-12);
        assert_eq!(log_blend(LOG_ZERO, 0.0, 1.0), LOG_ZERO);
    }
}
