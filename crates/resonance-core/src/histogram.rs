// ─────────────────────────────────────────────────────────────────────
// Resonance — Latency Histogram
// ─────────────────────────────────────────────────────────────────────
//! Bounded-cardinality latency recorder.
//!
//! Buckets (microseconds): 1 µs up to 1 ms, 10 µs up to 1 s, 1 ms above.
//! Values are capped at one hour, so the bucket count never exceeds
//! ~1000 + ~100k + ~3.6M in the worst case and stays small in practice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const US_PER_MS: f64 = 1000.0;
const LINEAR_LIMIT_US: f64 = 1_000.0;
const MID_LIMIT_US: f64 = 1_000_000.0;
const MAX_VALUE_US: f64 = 3_600_000_000.0;

/// Summary percentiles, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p95: f64,
    pub p99: f64,
    pub p99_9: f64,
    pub p99_99: f64,
    pub mean: f64,
}

/// One value of the percentile grid handed to the tail fit (ms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailSample {
    pub value: f64,
    /// Above the histogram's p99.
    pub is_extreme: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LatencyHistogram {
    buckets: BTreeMap<u64, u64>,
    count: u64,
    sum_us: f64,
    min_us: f64,
    max_us: f64,
}

fn bucket_of(value_us: f64) -> u64 {
    let v = value_us.clamp(0.0, MAX_VALUE_US);
    let b = if v <= LINEAR_LIMIT_US {
        v.round()
    } else if v <= MID_LIMIT_US {
        (v / 10.0).round() * 10.0
    } else {
        (v / 1000.0).round() * 1000.0
    };
    b as u64
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a latency in microseconds. Non-finite values are dropped.
    pub fn record_us(&mut self, value_us: f64) {
        if !value_us.is_finite() {
            log::warn!("LatencyHistogram: dropping non-finite value {value_us}");
            return;
        }
        let v = value_us.clamp(0.0, MAX_VALUE_US);
        *self.buckets.entry(bucket_of(v)).or_default() += 1;
        if self.count == 0 {
            self.min_us = v;
            self.max_us = v;
        } else {
            self.min_us = self.min_us.min(v);
            self.max_us = self.max_us.max(v);
        }
        self.count += 1;
        self.sum_us += v;
    }

    pub fn record_ms(&mut self, value_ms: f64) {
        self.record_us(value_ms * US_PER_MS);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bucket value at `percentile` ∈ [0, 100], in microseconds.
    pub fn value_at_percentile(&self, percentile: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        if percentile >= 100.0 {
            return self.max_us;
        }
        if percentile <= 0.0 {
            return self.min_us;
        }
        let target = ((percentile / 100.0) * self.count as f64).ceil() as u64;
        let mut cumulative = 0;
        for (&bucket, &n) in &self.buckets {
            cumulative += n;
            if cumulative >= target {
                return bucket as f64;
            }
        }
        self.max_us
    }

    pub fn percentiles(&self) -> Percentiles {
        let ms = |p: f64| self.value_at_percentile(p) / US_PER_MS;
        Percentiles {
            p95: ms(95.0),
            p99: ms(99.0),
            p99_9: ms(99.9),
            p99_99: ms(99.99),
            mean: if self.count > 0 {
                self.sum_us / self.count as f64 / US_PER_MS
            } else {
                0.0
            },
        }
    }

    /// `n` values at evenly spaced percentiles (i + ½)/n, in ms.
    ///
    /// Empty histogram ⇒ no samples.
    pub fn tail_samples(&self, n: usize) -> Vec<TailSample> {
        if self.count == 0 || n == 0 {
            return Vec::new();
        }
        let p99 = self.value_at_percentile(99.0) / US_PER_MS;
        (0..n)
            .map(|i| {
                let p = 100.0 * (i as f64 + 0.5) / n as f64;
                let value = self.value_at_percentile(p) / US_PER_MS;
                TailSample {
                    value,
                    is_extreme: value > p99,
                }
            })
            .collect()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
