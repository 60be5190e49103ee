// ─────────────────────────────────────────────────────────────────────
// Resonance — Tropical (Max-Plus) Semiring
// ─────────────────────────────────────────────────────────────────────
//! ⊕ = max, ⊗ = +, zero = −∞, one = 0. Used for path-cost composition
//! and critical-path reasoning over dependency graphs.

/// Additive identity.
pub const TROP_ZERO: f64 = f64::NEG_INFINITY;
/// Multiplicative identity.
pub const TROP_ONE: f64 = 0.0;

#[inline]
pub fn trop_add(a: f64, b: f64) -> f64 {
    a.max(b)
}

#[inline]
pub fn trop_mul(a: f64, b: f64) -> f64 {
    a + b
}

/// Max-plus matrix product of A (n×k) and B (k×m).
///
/// Ragged or empty inputs yield an empty result.
pub fn trop_matrix_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let (Some(a0), Some(b0)) = (a.first(), b.first()) else {
        return Vec::new();
    };
    let inner = a0.len();
    if inner != b.len() || a.iter().any(|r| r.len() != inner) {
        return Vec::new();
    }
    let m = b0.len();
    a.iter()
        .map(|row| {
            (0..m)
                .map(|j| {
                    row.iter()
                        .zip(b)
                        .fold(TROP_ZERO, |acc, (&aik, brow)| {
                            trop_add(acc, trop_mul(aik, brow.get(j).copied().unwrap_or(TROP_ZERO)))
                        })
                })
                .collect()
        })
        .collect()
}

/// Max-plus closure (Floyd–Warshall with ⊕/⊗) with a zero diagonal.
pub fn tropical_closure(distance: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = distance.len();
    let mut dist: Vec<Vec<f64>> = distance.to_vec();
    for (i, row) in dist.iter_mut().enumerate() {
        row.resize(n, TROP_ZERO);
        if row[i] == TROP_ZERO {
            row[i] = TROP_ONE;
        }
    }
    for k in 0..n {
        for i in 0..n {
            let dik = dist[i][k];
            if dik == TROP_ZERO {
                continue;
            }
            for j in 0..n {
                let via = trop_mul(dik, dist[k][j]);
                dist[i][j] = trop_add(dist[i][j], via);
            }
        }
    }
    dist
}

/// Longest (maximum-delay) path by max-plus Bellman–Ford relaxation.
///
/// Edges are `(from, to, cost)`; edges touching nodes ≥ `num_nodes` are
/// ignored. Returns the node sequence ending at the costliest node and
/// its cost. Every node starts at the tropical one (a path may start
/// anywhere).
pub fn critical_path(edges: &[(usize, usize, f64)], num_nodes: usize) -> (Vec<usize>, f64) {
    if num_nodes == 0 {
        return (Vec::new(), TROP_ZERO);
    }
    let mut dist = vec![TROP_ONE; num_nodes];
    let mut pred: Vec<Option<usize>> = vec![None; num_nodes];

    for _ in 0..num_nodes.saturating_sub(1) {
        let mut changed = false;
        for &(u, v, w) in edges {
            if u >= num_nodes || v >= num_nodes {
                continue;
            }
            let cand = trop_mul(dist[u], w);
            if cand > dist[v] {
                dist[v] = cand;
                pred[v] = Some(u);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let (end, cost) = dist
        .iter()
        .copied()
        .enumerate()
        .fold((0, TROP_ZERO), |best, (i, d)| if d > best.1 { (i, d) } else { best });

    let mut path = vec![end];
    let mut current = end;
    while let Some(p) = pred[current] {
        if path.len() > num_nodes {
            break;
        }
        path.push(p);
        current = p;
    }
    path.reverse();
    (path, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semiring_ops() {
        assert_eq!(trop_add(5.0, 3.0), 5.0);
        assert_eq!(trop_add(3.0, 5.0), 5.0);
        assert_eq!(trop_mul(5.0, 3.0), 8.0);
        assert_eq!(trop_mul(0.0, 10.0), 10.0);
    }

    #[test]
    fn test_identities() {
        for a in [-1e9, -3.5, 0.0, 2.0, 7.25, 1e12] {
            assert_eq!(trop_add(a, TROP_ZERO), a);
            assert_eq!(trop_mul(a, TROP_ONE), a);
        }
    }

    #[test]
    fn test_matrix_mul() {
        let a = vec![vec![0.0, 1.0], vec![TROP_ZERO, 2.0]];
        let b = vec![vec![3.0], vec![4.0]];
        let c = trop_matrix_mul(&a, &b);
        assert_eq!(c, vec![vec![5.0], vec![6.0]]);
    }

    #[test]
    fn test_matrix_mul_shape_mismatch() {
        assert!(trop_matrix_mul(&[vec![1.0, 2.0]], &[vec![1.0]]).is_empty());
    }

    #[test]
    fn test_closure_finds_longest_paths() {
        let z = TROP_ZERO;
        let d = vec![
            vec![z, 1.0, z],
            vec![z, z, 2.0],
            vec![z, z, z],
        ];
        let c = tropical_closure(&d);
        assert_eq!(c[0][2], 3.0);
        assert_eq!(c[1][1], 0.0);
        assert_eq!(c[2][0], z);
    }

    #[test]
    fn test_critical_path() {
        let graph = [(0, 1, 10.0), (1, 2, 20.0), (0, 2, 50.0)];
        let (path, cost) = critical_path(&graph, 3);
        assert_eq!(path, vec![0, 2]);
        assert_eq!(cost, 50.0);
    }

    #[test]
    fn test_critical_path_chain() {
        let graph = [(0, 1, 10.0), (1, 2, 20.0), (0, 2, 5.0)];
        let (path, cost) = critical_path(&graph, 3);
        assert_eq!(path, vec![0, 1, 2]);
        assert_eq!(cost, 30.0);
    }
}
