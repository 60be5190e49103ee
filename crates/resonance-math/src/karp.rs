// ─────────────────────────────────────────────────────────────────────
// Resonance — Max-Plus Eigenvalue (Karp Maximum Cycle Mean)
// ─────────────────────────────────────────────────────────────────────
//! The maximum cycle mean λ of a weighted digraph is its max-plus
//! eigenvalue and bounds the long-run per-step delay around any cycle.
//!
//! Karp: dp[k][v] = best weight of a walk of exactly k edges ending at v,
//! λ = max_v min_{k<n} (dp[n][v] − dp[k][v]) / (n − k).

use serde::{Deserialize, Serialize};

use resonance_types::{ResonanceError, ResonanceResult};

use crate::tropical::{trop_add, TROP_ZERO};

/// Directed, weighted dependency edge u → v.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub u: usize,
    pub v: usize,
    /// Coherence-modulated delay.
    pub w: f64,
}

/// Dense n×n max-plus weight matrix (row-major, missing edges = −∞).
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    n: usize,
    data: Vec<f64>,
}

impl WeightMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![TROP_ZERO; n * n],
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> f64 {
        self.data[u * self.n + v]
    }

    pub fn edge_count(&self) -> usize {
        self.data.iter().filter(|w| **w != TROP_ZERO).count()
    }
}

/// Build the weight matrix; parallel edges keep the larger weight.
///
/// An edge endpoint outside `0..n` or a non-finite weight is a
/// `Validation` error.
pub fn build_weight_matrix(n: usize, edges: &[GraphEdge]) -> ResonanceResult<WeightMatrix> {
    let mut m = WeightMatrix::new(n);
    for e in edges {
        if e.u >= n || e.v >= n {
            return Err(ResonanceError::Validation(format!(
                "edge {} -> {} out of range for {n} nodes",
                e.u, e.v
            )));
        }
        if !e.w.is_finite() {
            return Err(ResonanceError::Validation(format!(
                "edge {} -> {} has non-finite weight {}",
                e.u, e.v, e.w
            )));
        }
        let idx = e.u * n + e.v;
        m.data[idx] = trop_add(m.data[idx], e.w);
    }
    Ok(m)
}

/// Karp result: λ and a node on an optimal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleMean {
    /// Maximum cycle mean; −∞ for an empty or acyclic graph.
    pub lambda: f64,
    pub witness: Option<usize>,
}

pub fn max_cycle_mean_karp(w: &WeightMatrix) -> CycleMean {
    let n = w.size();
    if n == 0 {
        return CycleMean {
            lambda: TROP_ZERO,
            witness: None,
        };
    }

    // dp is (n+1) × n, row k = walks of exactly k edges.
    let mut dp = vec![TROP_ZERO; (n + 1) * n];
    dp[..n].fill(0.0);

    for k in 1..=n {
        for v in 0..n {
            let mut best = TROP_ZERO;
            for u in 0..n {
                let wuv = w.get(u, v);
                let prev = dp[(k - 1) * n + u];
                if wuv == TROP_ZERO || prev == TROP_ZERO {
                    continue;
                }
                best = best.max(prev + wuv);
            }
            dp[k * n + v] = best;
        }
    }

    let mut lambda = TROP_ZERO;
    let mut witness = None;
    for v in 0..n {
        let dn = dp[n * n + v];
        let mut min_avg = f64::INFINITY;
        for k in 0..n {
            let dk = dp[k * n + v];
            if dk == TROP_ZERO {
                continue;
            }
            min_avg = min_avg.min((dn - dk) / (n - k) as f64);
        }
        if min_avg > lambda {
            lambda = min_avg;
            witness = Some(v);
        }
    }

    CycleMean { lambda, witness }
}
