// ─────────────────────────────────────────────────────────────────────
// Resonance — Client
// ─────────────────────────────────────────────────────────────────────
//! Public task-execution API: controller-mediated submit, hedged
//! requests, bounded retry with backoff and token-bucket gating.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use resonance_core::{Clock, ResonanceCore};
use resonance_math::CalculusAction;
use resonance_types::{
    BackoffStrategy, HedgeConfig, ResonanceError, ResonanceState, RetryConfig, TaskHint, TokenBucketConfig,
};

use crate::token_bucket::TokenBucket;

/// Deferral budget and hedge threshold used by [`ResonanceClient::explain`].
const EXPLAIN_DEFER_BUDGET_MS: f64 = 50.0;
const EXPLAIN_HEDGE_THRESHOLD_MS: f64 = 100.0;

/// Failure of a client-managed task. The caller's error is carried
/// unmodified.
#[derive(Debug, Error)]
pub enum ClientError<E> {
    #[error("task failed: {0}")]
    Task(E),
    #[error("primary and hedge both failed; last error: {0}")]
    HedgeExhausted(E),
    #[error("rate limited: no token granted in {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("task aborted before completion")]
    Aborted,
    #[error(transparent)]
    Config(ResonanceError),
}

impl<E> ClientError<E> {
    /// The underlying task error, if there is one.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            ClientError::Task(e) | ClientError::HedgeExhausted(e) => Some(e),
            ClientError::RateLimited { .. } | ClientError::Aborted | ClientError::Config(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HedgeOutcome<T> {
    pub value: T,
    pub hedge_fired: bool,
    /// Zero when the hedge never fired.
    pub hedge_delay: Duration,
    /// 0 = primary, 1 = duplicate.
    pub winner: usize,
}

impl<T> HedgeOutcome<T> {
    fn unhedged(value: T) -> Self {
        Self {
            value,
            hedge_fired: false,
            hedge_delay: Duration::ZERO,
            winner: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainFeatures {
    pub r: f64,
    pub spectral_entropy: f64,
    pub k: f64,
    pub backlog: Option<f64>,
    pub bound_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub task_id: String,
    pub decision: CalculusAction,
    pub reason: String,
    pub features: ExplainFeatures,
}

pub struct ResonanceClient {
    core: Arc<ResonanceCore>,
    clock: Arc<dyn Clock>,
    token_bucket: Option<TokenBucket>,
    rng: Mutex<StdRng>,
}

impl ResonanceClient {
    /// Client sharing the core's clock.
    pub fn new(core: Arc<ResonanceCore>) -> Self {
        let clock = core.clock();
        Self {
            core,
            clock,
            token_bucket: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_token_bucket(mut self, cfg: &TokenBucketConfig) -> Self {
        self.token_bucket = Some(TokenBucket::new(cfg, Arc::clone(&self.clock)));
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn core(&self) -> &Arc<ResonanceCore> {
        &self.core
    }

    pub fn token_bucket(&self) -> Option<&TokenBucket> {
        self.token_bucket.as_ref()
    }

    pub async fn submit<F, Fut, T>(&self, run: F, hint: &TaskHint) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.core.decide_and_run(hint, run).await
    }

    /// Run immediately, bypassing the controller.
    pub async fn now<F, Fut, T>(&self, run: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        run().await
    }

    /// Fire `run`, and fire it again if it has not settled after
    /// `cfg.delay_ms`; the first success wins.
    ///
    /// Non-idempotent hints skip hedging when `cfg.idempotent_only` is set.
    /// A primary that fails before the timer returns its error directly.
    /// The losing branch keeps running detached unless
    /// `cfg.cancel_on_first` is set.
    pub async fn hedge<F, Fut, T, E>(
        &self,
        run: F,
        hint: &TaskHint,
        cfg: &HedgeConfig,
    ) -> Result<HedgeOutcome<T>, ClientError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if cfg.idempotent_only && !hint.idempotent {
            log::debug!("hedge skipped for non-idempotent task {}", hint.id);
            return self
                .submit(&run, hint)
                .await
                .map(HedgeOutcome::unhedged)
                .map_err(ClientError::Task);
        }

        let delay = Duration::from_millis(cfg.delay_ms);
        let mut primary = tokio::spawn(run());
        let timer = self.clock.sleep(delay);

        tokio::select! {
            biased;
            joined = &mut primary => {
                return settle(joined)?
                    .map(HedgeOutcome::unhedged)
                    .map_err(ClientError::Task);
            }
            _ = timer => {}
        }

        log::debug!("hedge fired for task {} after {delay:?}", hint.id);
        let duplicate = tokio::spawn(run());
        let (winner, value) = race_branches(primary, duplicate, cfg.cancel_on_first).await?;
        Ok(HedgeOutcome {
            value,
            hedge_fired: true,
            hedge_delay: delay,
            winner,
        })
    }

    /// Up to `cfg.max_attempts` attempts with backoff between them.
    ///
    /// With `cfg.token_bucket` set and a bucket attached, an attempt that
    /// finds the bucket empty backs off instead of running. Exhaustion
    /// returns the last task error, or `RateLimited` if nothing ran.
    pub async fn retry<F, Fut, T, E>(&self, mut run: F, cfg: &RetryConfig) -> Result<T, ClientError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        cfg.validate().map_err(ClientError::Config)?;
        let gate = cfg.token_bucket.as_ref().and(self.token_bucket.as_ref());
        let mut last_err = None;

        for attempt in 0..cfg.max_attempts {
            if let Some(bucket) = gate {
                if !bucket.take() {
                    log::debug!("retry attempt {attempt} rate limited");
                    self.clock.sleep(self.backoff_delay(cfg, attempt)).await;
                    continue;
                }
            }

            match run().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < cfg.max_attempts {
                        self.clock.sleep(self.backoff_delay(cfg, attempt)).await;
                    }
                }
            }
        }

        match last_err {
            Some(e) => Err(ClientError::Task(e)),
            None => Err(ClientError::RateLimited {
                attempts: cfg.max_attempts,
            }),
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff_delay(&self, cfg: &RetryConfig, attempt: u32) -> Duration {
        let base = cfg.base_delay_ms as f64;
        let max = cfg.max_delay_ms as f64;
        let exp = base * 2f64.powi(attempt.min(i32::MAX as u32) as i32);
        let ms = match cfg.strategy {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Exponential => exp.min(max),
            BackoffStrategy::FullJitter => (self.rng.lock().gen::<f64>() * exp).min(max),
        };
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }

    /// Backlog-based view of how a task would be admitted now.
    pub fn explain(&self, task_id: &str) -> Explanation {
        let state = self.core.get_state();
        let decision = self
            .core
            .forecast(EXPLAIN_DEFER_BUDGET_MS, EXPLAIN_HEDGE_THRESHOLD_MS);

        let mut features = ExplainFeatures {
            r: state.r,
            spectral_entropy: state.spectral_entropy,
            k: state.k,
            backlog: None,
            bound_ms: None,
        };
        match decision {
            Some(d) => {
                features.backlog = Some(d.backlog);
                features.bound_ms = Some(d.bound_ms);
                Explanation {
                    task_id: task_id.to_string(),
                    decision: d.action,
                    reason: d.reason,
                    features,
                }
            }
            None => Explanation {
                task_id: task_id.to_string(),
                decision: CalculusAction::Execute,
                reason: "no backlog forecaster attached".to_string(),
                features,
            },
        }
    }

    pub fn state(&self) -> ResonanceState {
        self.core.get_state()
    }
}

/// Race two running branches; the first success wins.
///
/// A failed or cancelled first finisher hands over to the other branch.
/// Both failing yields the latest task error, and both cancelled yields
/// `Aborted`.
async fn race_branches<T, E>(
    mut primary: JoinHandle<Result<T, E>>,
    mut duplicate: JoinHandle<Result<T, E>>,
    cancel_on_first: bool,
) -> Result<(usize, T), ClientError<E>> {
    let (first_idx, first) = tokio::select! {
        joined = &mut primary => (0, joined),
        joined = &mut duplicate => (1, joined),
    };
    let (mut survivor, survivor_idx) = if first_idx == 0 {
        (duplicate, 1)
    } else {
        (primary, 0)
    };

    let first_err = match settle(first) {
        Ok(Ok(value)) => {
            if cancel_on_first {
                survivor.abort();
            }
            return Ok((first_idx, value));
        }
        Ok(Err(e)) => Some(e),
        Err(_) => {
            log::debug!("hedge branch {first_idx} cancelled; awaiting branch {survivor_idx}");
            None
        }
    };

    match settle((&mut survivor).await) {
        Ok(Ok(value)) => Ok((survivor_idx, value)),
        Ok(Err(e)) => Err(ClientError::HedgeExhausted(e)),
        Err(aborted) => match first_err {
            Some(e) => Err(ClientError::HedgeExhausted(e)),
            None => Err(aborted),
        },
    }
}

/// Unwrap a join result, re-raising task panics.
fn settle<T, E>(joined: Result<Result<T, E>, JoinError>) -> Result<Result<T, E>, ClientError<E>> {
    match joined {
        Ok(res) => Ok(res),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(ClientError::Aborted),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resonance_core::{ManualClock, TokioClock};
    use resonance_types::{CoreConfig, Mode};

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn tokio_client() -> ResonanceClient {
        let core = ResonanceCore::with_seed(CoreConfig::default(), Arc::new(TokioClock::new()), 1)
            .unwrap();
        ResonanceClient::new(Arc::new(core)).with_seed(1)
    }

    fn manual_client() -> (ResonanceClient, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let core = ResonanceCore::with_seed(CoreConfig::default(), clock.clone(), 1).unwrap();
        (ResonanceClient::new(Arc::new(core)).with_seed(1), clock)
    }

    fn idempotent() -> TaskHint {
        TaskHint::new("read").idempotent(true)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_not_fired_when_primary_fast() {
        let client = tokio_client();
        let out = client
            .hedge(
                || async {
                    tokio::time::sleep(ms(10)).await;
                    Ok::<_, String>(5)
                },
                &idempotent(),
                &HedgeConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.value, 5);
        assert!(!out.hedge_fired);
        assert_eq!(out.winner, 0);
        assert_eq!(out.hedge_delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_duplicate_wins_against_slow_primary() {
        let client = tokio_client();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let out = client
            .hedge(
                move || {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    async move {
                        let d = if n == 0 { 500 } else { 10 };
                        tokio::time::sleep(ms(d)).await;
                        Ok::<_, String>(n)
                    }
                },
                &idempotent(),
                &HedgeConfig::default(),
            )
            .await
            .unwrap();
        assert!(out.hedge_fired);
        assert_eq!(out.winner, 1);
        assert_eq!(out.value, 1);
        assert_eq!(out.hedge_delay, ms(50));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_falls_back_to_surviving_branch() {
        let client = tokio_client();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        // Primary succeeds late; duplicate fails fast.
        let out = client
            .hedge(
                move || {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            tokio::time::sleep(ms(200)).await;
                            Ok(42)
                        } else {
                            tokio::time::sleep(ms(5)).await;
                            Err("boom".to_string())
                        }
                    }
                },
                &idempotent(),
                &HedgeConfig::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.value, 42);
        assert_eq!(out.winner, 0);
        assert!(out.hedge_fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_both_fail() {
        let client = tokio_client();
        let err = client
            .hedge(
                || async {
                    tokio::time::sleep(ms(100)).await;
                    Err::<u32, _>("down".to_string())
                },
                &idempotent(),
                &HedgeConfig::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::HedgeExhausted(ref e) if e == "down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_primary_error_before_timer() {
        let client = tokio_client();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let err = client
            .hedge(
                move || {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Err::<u32, _>("bad request".to_string()) }
                },
                &idempotent(),
                &HedgeConfig::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Task(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hedge_skipped_for_non_idempotent() {
        let client = tokio_client();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let out = client
            .hedge(
                move || {
                    c.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::time::sleep(ms(500)).await;
                        Ok::<_, String>(())
                    }
                },
                &TaskHint::new("write"),
                &HedgeConfig::default(),
            )
            .await
            .unwrap();
        assert!(!out.hedge_fired);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let (client, clock) = manual_client();
        let mut n = 0;
        let cfg = RetryConfig {
            strategy: BackoffStrategy::Fixed,
            ..Default::default()
        };
        let v = client
            .retry(
                || {
                    n += 1;
                    let attempt = n;
                    async move {
                        if attempt < 3 {
                            Err(attempt)
                        } else {
                            Ok("done")
                        }
                    }
                },
                &cfg,
            )
            .await
            .unwrap();
        assert_eq!(v, "done");
        assert_eq!(clock.sleeps(), vec![ms(10), ms(10)]);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let (client, clock) = manual_client();
        let mut n = 0;
        let cfg = RetryConfig {
            strategy: BackoffStrategy::Exponential,
            max_attempts: 4,
            ..Default::default()
        };
        let err = client
            .retry(
                || {
                    n += 1;
                    let attempt = n;
                    async move { Err::<(), _>(attempt) }
                },
                &cfg,
            )
            .await
            .unwrap_err();
        assert_eq!(err.into_task_error(), Some(4));
        assert_eq!(clock.sleeps(), vec![ms(10), ms(20), ms(40)]);
    }

    #[tokio::test]
    async fn test_retry_rate_limited() {
        let (client, _) = manual_client();
        let bucket = TokenBucketConfig {
            refill_rate: 0.0,
            capacity: 0.0,
            local_only: true,
        };
        let client = client.with_token_bucket(&bucket);
        let cfg = RetryConfig {
            token_bucket: Some(bucket),
            ..Default::default()
        };
        let mut ran = false;
        let err = client
            .retry(
                || {
                    ran = true;
                    async { Ok::<_, String>(()) }
                },
                &cfg,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RateLimited { attempts: 3 }));
        assert!(!ran);
    }

    #[test]
    fn test_backoff_strategies() {
        let (client, _) = manual_client();
        let mut cfg = RetryConfig {
            base_delay_ms: 100,
            max_delay_ms: 500,
            ..Default::default()
        };
        cfg.strategy = BackoffStrategy::Exponential;
        assert_eq!(client.backoff_delay(&cfg, 1), ms(200));
        assert_eq!(client.backoff_delay(&cfg, 5), ms(500));
        cfg.strategy = BackoffStrategy::FullJitter;
        for attempt in 0..8 {
            assert!(client.backoff_delay(&cfg, attempt) <= ms(500));
        }
        cfg.strategy = BackoffStrategy::Fixed;
        assert_eq!(client.backoff_delay(&cfg, 7), ms(100));
    }

    #[tokio::test]
    async fn test_submit_and_now() {
        let (client, clock) = manual_client();
        client.core().set_mode(Mode::Observe);
        assert_eq!(client.submit(|| async { 1 }, &TaskHint::new("a")).await, 1);
        assert_eq!(client.now(|| async { 2 }).await, 2);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_explain_idle() {
        let (client, _) = manual_client();
        let e = client.explain("t-1");
        assert_eq!(e.task_id, "t-1");
        assert_eq!(e.decision, CalculusAction::Execute);
        assert_eq!(e.features.backlog, Some(0.0));
    }

    #[test]
    fn test_explain_without_forecaster() {
        let cfg = CoreConfig {
            track_backlog: false,
            ..Default::default()
        };
        let core = ResonanceCore::with_clock(cfg, Arc::new(ManualClock::new())).unwrap();
        let client = ResonanceClient::new(Arc::new(core));
        let e = client.explain("t-2");
        assert_eq!(e.decision, CalculusAction::Execute);
        assert!(e.features.backlog.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_branch_hands_over_to_survivor() {
        let primary = tokio::spawn(async {
            tokio::time::sleep(ms(500)).await;
            Ok::<_, String>(0)
        });
        primary.abort();
        let duplicate = tokio::spawn(async {
            tokio::time::sleep(ms(20)).await;
            Ok::<_, String>(7)
        });
        let (winner, value) = race_branches(primary, duplicate, false).await.unwrap();
        assert_eq!((winner, value), (1, 7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_branches_cancelled() {
        let primary = tokio::spawn(async { Ok::<u32, String>(1) });
        let duplicate = tokio::spawn(async { Ok::<u32, String>(2) });
        primary.abort();
        duplicate.abort();
        let err = race_branches(primary, duplicate, false).await.unwrap_err();
        assert!(matches!(err, ClientError::Aborted));
    }

    #[tokio::test]
    async fn test_retry_rejects_zero_attempts() {
        let (client, _) = manual_client();
        let cfg = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let mut ran = false;
        let err = client
            .retry(
                || {
                    ran = true;
                    async { Ok::<_, String>(()) }
                },
                &cfg,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(ResonanceError::Config(_))));
        assert!(!ran);
    }
}
