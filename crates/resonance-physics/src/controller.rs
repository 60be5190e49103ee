// ─────────────────────────────────────────────────────────────────────
// Resonance — PI Band Controller
// ─────────────────────────────────────────────────────────────────────
//! Holds R(t) inside [R_low, R_high].
//!
//!   e = (R_low + R_high)/2 − R
//!   I ← clamp(I + e, −1, 1)
//!   u = kp·e + ki·I
//!
//! Over-coherent (R > R_high): random micro-delay, K −|u|, random dither.
//! Under-coherent (R < R_low): K +|u|, batch of 2 when entropy > 0.7.
//! In band: dither 0, nothing else.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use resonance_types::{Actuators, ControllerConfig, ControllerConfigPatch, Features};

const NOISY_ENTROPY: f64 = 0.7;
const NOISY_BATCH_SIZE: u32 = 2;

/// Anti-windup PI integrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiIntegrator {
    pub kp: f64,
    pub ki: f64,
    pub integral: f64,
    pub integral_min: f64,
    pub integral_max: f64,
}

impl PiIntegrator {
    pub fn new(kp: f64, ki: f64) -> Self {
        Self {
            kp,
            ki,
            integral: 0.0,
            integral_min: -1.0,
            integral_max: 1.0,
        }
    }

    /// One unit-step update; returns the control effort u.
    pub fn step(&mut self, error: f64) -> f64 {
        let raw = self.integral + error;
        self.integral = raw.clamp(self.integral_min, self.integral_max);
        if raw != self.integral {
            log::debug!("PI integrator saturated at {:.3} (raw {raw:.3})", self.integral);
        }
        self.kp * error + self.ki * self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
    }
}

impl Default for PiIntegrator {
    fn default() -> Self {
        Self::new(0.6, 0.2)
    }
}

/// Maps [`Features`] to [`Actuators`].
pub struct BandController {
    cfg: ControllerConfig,
    pi: PiIntegrator,
    rng: StdRng,
}

impl BandController {
    pub fn new(cfg: ControllerConfig) -> Self {
        Self::with_rng(cfg, StdRng::from_entropy())
    }

    /// Deterministic controller for tests and replays.
    pub fn with_seed(cfg: ControllerConfig, seed: u64) -> Self {
        Self::with_rng(cfg, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: ControllerConfig, rng: StdRng) -> Self {
        Self {
            cfg,
            pi: PiIntegrator::default(),
            rng,
        }
    }

    pub fn with_gains(mut self, kp: f64, ki: f64) -> Self {
        self.pi = PiIntegrator::new(kp, ki);
        self
    }

    pub fn decide(&mut self, feat: &Features) -> Actuators {
        let (r_low, r_high) = (self.cfg.r_low(), self.cfg.r_high());
        let target = 0.5 * (r_low + r_high);
        let u = self.pi.step(target - feat.r);

        if feat.r > r_high {
            let max = self.cfg.max_micro_delay_ms;
            let delay = (self.rng.gen::<f64>() * max).round().min(max);
            Actuators {
                micro_delay_ms: Some(delay),
                adjust_k: Some(-u.abs()),
                dither: Some(self.rng.gen::<f64>()),
                batch_size: None,
            }
        } else if feat.r < r_low {
            Actuators {
                adjust_k: Some(u.abs()),
                batch_size: (feat.spectral_entropy > NOISY_ENTROPY).then_some(NOISY_BATCH_SIZE),
                ..Default::default()
            }
        } else {
            Actuators {
                dither: Some(0.0),
                ..Default::default()
            }
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    pub fn update_config(&mut self, patch: &ControllerConfigPatch) {
        self.cfg.merge(patch);
    }

    pub fn integral(&self) -> f64 {
        self.pi.integral
    }

    /// Zeroes the integrator; configuration is kept.
    pub fn reset(&mut self) {
        self.pi.reset();
    }
}

#[cfg(test)]
mod tests {
    use resonance_types::RSource;

    use super::*;

    fn features(r: f64, entropy: f64) -> Features {
        Features {
            r,
            spectral_entropy: entropy,
            p99_risk: 0.0,
            sigma_theta: 1.0 - r,
            backlog_bound: None,
            source: RSource::Warmup,
        }
    }

    #[test]
    fn test_over_coherent_delay_bounded() {
        let cfg = ControllerConfig::default();
        let max = cfg.max_micro_delay_ms;
        let mut c = BandController::with_seed(cfg, 7);
        for i in 0..500 {
            let r = 0.66 + 0.34 * (i as f64 / 500.0);
            let act = c.decide(&features(r, 0.5));
            let d = act.micro_delay_ms.unwrap();
            assert!((0.0..=max).contains(&d), "delay={d}");
            assert!(act.adjust_k.unwrap() <= 0.0);
            let dither = act.dither.unwrap();
            assert!((0.0..1.0).contains(&dither));
        }
    }

    #[test]
    fn test_under_coherent_never_negative_k() {
        let mut c = BandController::with_seed(ControllerConfig::default(), 1);
        for i in 0..200 {
            let r = 0.34 * (i as f64 / 200.0);
            let act = c.decide(&features(r, 0.2));
            assert!(act.adjust_k.unwrap() >= 0.0);
            assert!(act.micro_delay_ms.is_none());
        }
    }

    #[test]
    fn test_noisy_entropy_suggests_batch() {
        let mut c = BandController::with_seed(ControllerConfig::default(), 1);
        assert_eq!(c.decide(&features(0.1, 0.9)).batch_size, Some(2));
        assert_eq!(c.decide(&features(0.1, 0.5)).batch_size, None);
    }

    #[test]
    fn test_in_band_no_actuation() {
        let mut c = BandController::with_seed(ControllerConfig::default(), 1);
        let act = c.decide(&features(0.5, 0.9));
        assert_eq!(act.dither, Some(0.0));
        assert!(act.is_noop());
        assert!(act.adjust_k.is_none());
    }

    #[test]
    fn test_integrator_anti_windup() {
        let mut c = BandController::with_seed(ControllerConfig::default(), 1);
        for _ in 0..100 {
            c.decide(&features(0.0, 0.5));
        }
        assert!((c.integral() - 1.0).abs() < 1e-12);
        c.reset();
        assert_eq!(c.integral(), 0.0);
    }

    #[test]
    fn test_update_config_merges() {
        let mut c = BandController::with_seed(ControllerConfig::default(), 1);
        c.update_config(&ControllerConfigPatch {
            max_micro_delay_ms: Some(0.0),
            ..Default::default()
        });
        assert_eq!(c.config().max_micro_delay_ms, 0.0);
        assert_eq!(c.config().r_band, [0.35, 0.65]);
        assert_eq!(c.decide(&features(0.9, 0.5)).micro_delay_ms, Some(0.0));
    }

    #[test]
    fn test_pi_step_gains() {
        let mut pi = PiIntegrator::default();
        let u = pi.step(0.5);
        assert!((u - (0.6 * 0.5 + 0.2 * 0.5)).abs() < 1e-12);
    }
}
