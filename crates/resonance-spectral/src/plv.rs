// ─────────────────────────────────────────────────────────────────────
// Resonance — Phase-Locking Value
// ─────────────────────────────────────────────────────────────────────
//! PLV = |mean(e^{i(θ_i − θ_j)})|: 1 for a constant phase offset
//! (in-phase or anti-phase), 0 for independent series.

use serde::{Deserialize, Serialize};

/// One pairwise PLV measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlvEdge {
    pub i: usize,
    pub j: usize,
    pub plv: f64,
}

/// PLV between two phase series over their common length.
pub fn plv(phases_i: &[f64], phases_j: &[f64]) -> f64 {
    let n = phases_i.len().min(phases_j.len());
    if n == 0 {
        return 0.0;
    }
    let (re, im) = phases_i
        .iter()
        .zip(phases_j)
        .fold((0.0, 0.0), |(re, im), (a, b)| {
            let d = a - b;
            (re + d.cos(), im + d.sin())
        });
    (re.hypot(im) / n as f64).clamp(0.0, 1.0)
}

/// All pairwise PLVs sorted descending, truncated to `top_n`.
pub fn plv_matrix(series: &[Vec<f64>], top_n: usize) -> Vec<PlvEdge> {
    let mut edges = Vec::with_capacity(series.len() * series.len().saturating_sub(1) / 2);
    for i in 0..series.len() {
        for j in (i + 1)..series.len() {
            edges.push(PlvEdge {
                i,
                j,
                plv: plv(&series[i], &series[j]),
            });
        }
    }
    edges.sort_by(|a, b| b.plv.total_cmp(&a.plv));
    edges.truncate(top_n);
    edges
}

/// Connected components of the PLV ≥ `threshold` graph.
///
/// Singletons are omitted.
pub fn detect_communities(series: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let n = series.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if plv(&series[i], &series[j]) >= threshold {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }

    let mut visited = vec![false; n];
    let mut communities = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut community = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            community.push(node);
            stack.extend(adj[node].iter().copied().filter(|&m| !visited[m]));
        }
        if community.len() > 1 {
            community.sort_unstable();
            communities.push(community);
        }
    }
    communities
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    #[test]
    fn test_synchronised() {
        assert!((plv(&[0.0; 4], &[0.0; 4]) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_anti_phase_is_locked() {
        assert!((plv(&[0.0; 4], &[PI; 4]) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_desynchronised() {
        let v = plv(&[0.0, 0.1, 0.2, 0.3], &[1.5, 2.0, 1.0, 2.5]);
        assert!(v > 0.0 && v < 1.0, "plv={v}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(plv(&[], &[1.0]), 0.0);
    }

    #[test]
    fn test_matrix_sorted_and_truncated() {
        let series = vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.0, 2.0, 4.0],
        ];
        let edges = plv_matrix(&series, 2);
        assert_eq!(edges.len(), 2);
        assert!(edges[0].plv >= edges[1].plv);
        assert_eq!((edges[0].i, edges[0].j), (0, 1));
    }

    #[test]
    fn test_communities() {
        let series = vec![
            vec![0.0, 0.5, 1.0, 1.5],
            vec![0.1, 0.6, 1.1, 1.6],
            vec![0.0, 2.1, 0.7, 4.4],
        ];
        let communities = detect_communities(&series, 0.9);
        assert_eq!(communities, vec![vec![0, 1]]);
    }
}
