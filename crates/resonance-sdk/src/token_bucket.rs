// ─────────────────────────────────────────────────────────────────────
// Resonance — Token Bucket
// ─────────────────────────────────────────────────────────────────────
//! Continuous refill, computed lazily on access:
//!
//!   tokens ← min(capacity, tokens + elapsed · rate)

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use resonance_core::Clock;
use resonance_types::TokenBucketConfig;

#[derive(Debug)]
struct Level {
    tokens: f64,
    last_refill: Duration,
}

pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    level: Mutex<Level>,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Starts full.
    pub fn new(cfg: &TokenBucketConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = cfg.capacity.max(0.0);
        Self {
            capacity,
            refill_rate: cfg.refill_rate.max(0.0),
            level: Mutex::new(Level {
                tokens: capacity,
                last_refill: clock.now(),
            }),
            clock,
        }
    }

    fn refill(&self, level: &mut Level) {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(level.last_refill).as_secs_f64();
        level.tokens = (level.tokens + elapsed * self.refill_rate).min(self.capacity);
        level.last_refill = now;
    }

    /// Consume one token if available.
    pub fn take(&self) -> bool {
        let mut level = self.level.lock();
        self.refill(&mut level);
        if level.tokens >= 1.0 {
            level.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Current level after refill.
    pub fn tokens(&self) -> f64 {
        let mut level = self.level.lock();
        self.refill(&mut level);
        level.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
