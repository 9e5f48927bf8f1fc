//! PID pacing controller turning observed spend rates into bid multipliers.

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::common::error::UpliftResult;

use super::domain::{AntiWindup, ControllerConfig, PacingSnapshot, PacingState};

/// Discrete-time PID controller over the spend-rate error.
///
/// `update` is history dependent: each output depends on every earlier
/// observation through the integral and the last error, so calls must be
/// applied in order by a single owner.
#[derive(Clone, Debug)]
pub struct PacingController {
    config: ControllerConfig,
    state: PacingState,
    steps: u64,
}

impl PacingController {
    pub fn new(config: ControllerConfig) -> UpliftResult<Self> {
        config.validate()?;
        if config.anti_windup == AntiWindup::Unbounded && config.ki > 0.0 {
            warn!(
                ki = config.ki,
                "pacing integral is unbounded; long streaks can wind up the multiplier"
            );
        }
        let state = PacingState::initial(&config);
        Ok(Self {
            config,
            state,
            steps: 0,
        })
    }

    /// Apply one observation and return the new adjustment factor.
    pub fn update(&mut self, observed_spend_rate: f64) -> f64 {
        if !observed_spend_rate.is_finite() {
            warn!(
                observed_spend_rate,
                step = self.steps,
                "ignoring non-finite spend rate"
            );
            return self.state.adjustment_factor;
        }

        let cfg = &self.config;
        let error = cfg.target_spend_rate - observed_spend_rate;

        let mut integral = self.state.integral_error + error;
        if let AntiWindup::Clamp { limit } = cfg.anti_windup {
            integral = integral.clamp(-limit, limit);
        }
        let derivative = error - self.state.last_error;
        let adjustment = cfg.kp * error + cfg.ki * integral + cfg.kd * derivative;

        let proposed = self.state.adjustment_factor + adjustment;
        let mut factor = proposed.max(cfg.floor);
        if let Some(ceiling) = cfg.ceiling {
            factor = factor.min(ceiling);
        }
        let saturated = factor != proposed;
        if saturated && cfg.anti_windup == AntiWindup::ResetOnSaturation {
            integral = 0.0;
        }

        self.state = PacingState {
            integral_error: integral,
            last_error: error,
            adjustment_factor: factor,
        };
        self.steps += 1;

        debug!(
            step = self.steps,
            observed_spend_rate,
            error,
            integral,
            derivative,
            adjustment,
            factor,
            saturated,
            "pacing update"
        );
        factor
    }

    /// Restore the initial state for a new budget period.
    pub fn reset(&mut self) {
        self.state = PacingState::initial(&self.config);
        self.steps = 0;
    }

    pub fn adjustment_factor(&self) -> f64 {
        self.state.adjustment_factor
    }

    pub fn state(&self) -> PacingState {
        self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PacingSnapshot {
        PacingSnapshot {
            step: self.steps,
            adjustment_factor: self.state.adjustment_factor,
        }
    }
}

/// Controller shared between the pacing loop and bidding threads.
///
/// Updates are serialised by the lock; readers get a copy of the multiplier
/// taken under the same lock, so no bid sees a half-applied update.
#[derive(Debug)]
pub struct SharedPacer {
    inner: Mutex<PacingController>,
}

impl SharedPacer {
    pub fn new(controller: PacingController) -> Self {
        Self {
            inner: Mutex::new(controller),
        }
    }

    pub fn update(&self, observed_spend_rate: f64) -> PacingSnapshot {
        let mut controller = self.inner.lock();
        controller.update(observed_spend_rate);
        controller.snapshot()
    }

    pub fn snapshot(&self) -> PacingSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn state(&self) -> PacingState {
        self.inner.lock().state()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn into_inner(self) -> PacingController {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn reference() -> PacingController {
        PacingController::new(ControllerConfig::new(0.1, 0.01, 0.05, 0.2)).unwrap()
    }

    #[test]
    fn underspend_then_overspend() {
        let mut pacer = reference();
        let up = pacer.update(0.05);
        assert!(up > 1.0);
        assert!((up - 1.024).abs() < 1e-12);

        let down = pacer.update(0.80);
        assert!(down < up);
        assert!(down >= 0.1);
        assert!((down - 0.922).abs() < 1e-12);

        let state = pacer.state();
        assert!((state.integral_error + 0.45).abs() < 1e-12);
        assert!((state.last_error + 0.6).abs() < 1e-12);
    }

    #[test]
    fn underspend_raises_multiplier_from_rest() {
        let mut pacer =
            PacingController::new(ControllerConfig::new(0.1, 0.01, 0.05, 0.5)).unwrap();
        let before = pacer.adjustment_factor();
        pacer.update(0.1);
        assert!(pacer.adjustment_factor() > before);
    }

    #[test]
    fn floor_holds_under_extreme_overspend() {
        let mut pacer = reference();
        for _ in 0..500 {
            assert!(pacer.update(1.0) >= 0.1);
        }
        assert_eq!(pacer.adjustment_factor(), 0.1);
    }

    #[test]
    fn ceiling_caps_long_underspend() {
        let cfg = ControllerConfig::new(0.1, 0.01, 0.05, 0.2).with_ceiling(3.0);
        let mut pacer = PacingController::new(cfg).unwrap();
        for _ in 0..1_000 {
            assert!(pacer.update(0.0) <= 3.0);
        }
        assert_eq!(pacer.adjustment_factor(), 3.0);
    }

    #[test]
    fn clamp_bounds_integral() {
        let cfg = ControllerConfig::new(0.1, 0.01, 0.05, 0.2)
            .with_anti_windup(AntiWindup::Clamp { limit: 0.5 });
        let mut pacer = PacingController::new(cfg).unwrap();
        for _ in 0..100 {
            pacer.update(0.0);
            assert!(pacer.state().integral_error <= 0.5);
        }
        assert_eq!(pacer.state().integral_error, 0.5);
    }

    #[test]
    fn reset_on_saturation_recovers_faster() {
        let unbounded = ControllerConfig::new(0.1, 0.01, 0.0, 0.2);
        let reset = unbounded
            .clone()
            .with_anti_windup(AntiWindup::ResetOnSaturation);
        let mut a = PacingController::new(unbounded).unwrap();
        let mut b = PacingController::new(reset).unwrap();

        for _ in 0..200 {
            a.update(1.0);
            b.update(1.0);
        }
        assert_eq!(b.state().integral_error, 0.0);
        assert!(a.state().integral_error < -100.0);

        // back on target: the reset variant is free to move, the wound-up one is pinned
        a.update(0.2);
        b.update(0.2);
        a.update(0.1);
        b.update(0.1);
        assert_eq!(a.adjustment_factor(), 0.1);
        assert!(b.adjustment_factor() > 0.1);
    }

    #[test]
    fn reset_on_saturation_engages_at_ceiling() {
        let unbounded = ControllerConfig::new(0.1, 0.01, 0.0, 0.2).with_ceiling(1.5);
        let reset = unbounded
            .clone()
            .with_anti_windup(AntiWindup::ResetOnSaturation);
        let mut a = PacingController::new(unbounded).unwrap();
        let mut b = PacingController::new(reset).unwrap();

        for _ in 0..200 {
            a.update(0.0);
            b.update(0.0);
        }
        assert_eq!(b.adjustment_factor(), 1.5);
        assert_eq!(b.state().integral_error, 0.0);
        assert!(a.state().integral_error > 30.0);

        // first overspend: the wound-up integral still pushes against the ceiling
        assert_eq!(a.update(1.0), 1.5);
        assert!(b.update(1.0) < 1.5);
    }

    #[test]
    fn identical_histories_give_identical_outputs() {
        let rates = [0.05, 0.3, 0.1, 0.0, 0.9, 0.2, 0.15];
        let mut a = reference();
        let mut b = reference();
        let out_a: Vec<f64> = rates.iter().map(|r| a.update(*r)).collect();
        let out_b: Vec<f64> = rates.iter().map(|r| b.update(*r)).collect();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn order_of_observations_matters() {
        let mut a = reference();
        let mut b = reference();
        a.update(0.05);
        a.update(0.8);
        b.update(0.8);
        b.update(0.05);
        assert_ne!(a.adjustment_factor(), b.adjustment_factor());
    }

    #[test]
    fn reset_matches_fresh_controller() {
        let mut used = reference();
        for rate in [0.0, 0.5, 0.9] {
            used.update(rate);
        }
        used.reset();
        let mut fresh = reference();
        assert_eq!(used.state(), fresh.state());
        assert_eq!(used.snapshot().step, 0);
        assert_eq!(used.update(0.05), fresh.update(0.05));
    }

    #[test]
    fn non_finite_observation_is_ignored() {
        let mut pacer = reference();
        pacer.update(0.05);
        let before = pacer.state();
        assert_eq!(pacer.update(f64::NAN), before.adjustment_factor);
        assert_eq!(pacer.state(), before);
        assert_eq!(pacer.snapshot().step, 1);
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        assert!(PacingController::new(ControllerConfig::new(0.1, 0.01, 0.05, 0.0)).is_err());
    }

    #[test]
    fn shared_pacer_serialises_updates() {
        let pacer = Arc::new(SharedPacer::new(reference()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                thread::spawn(move || {
                    for _ in 0..50 {
                        pacer.update(0.2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snap = pacer.snapshot();
        assert_eq!(snap.step, 400);
        // on-target observations never move the multiplier
        assert_eq!(snap.adjustment_factor, 1.0);
    }
}
