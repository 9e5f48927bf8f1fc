//! Property-based checks for scoring, bidding, pacing and the Qini curve.

use std::sync::Arc;

use proptest::prelude::*;
use uplift_pacer::bidding::service::bid;
use uplift_pacer::evaluation::{qini_curve, EvaluationRow, EvaluationSet};
use uplift_pacer::inference::{EstimateError, ProbabilityEstimator, UpliftScore, UpliftScorer};
use uplift_pacer::pacing::{AntiWindup, ControllerConfig, PacingController};
use uplift_pacer::FeatureVector;

struct Constant(f64);

impl ProbabilityEstimator for Constant {
    fn score(&self, _: &FeatureVector) -> Result<f64, EstimateError> {
        Ok(self.0)
    }
}

fn gains() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (0.0..1.0f64, 0.0..0.5f64, 0.0..1.0f64, 0.01..=1.0f64)
}

proptest! {
    #[test]
    fn uplift_is_exact_difference(p_t in 0.0..=1.0f64, p_c in 0.0..=1.0f64) {
        let scorer = UpliftScorer::new(Arc::new(Constant(p_t)), Arc::new(Constant(p_c)));
        let uplift = scorer.score(&FeatureVector::new(vec![0.0; 4])).unwrap().value();
        prop_assert!((-1.0..=1.0).contains(&uplift));
        prop_assert_eq!(uplift, p_t - p_c);
    }

    #[test]
    fn bid_is_never_negative(
        uplift in any::<f64>(),
        value in any::<f64>(),
        multiplier in any::<f64>(),
    ) {
        let b = bid(UpliftScore::new(uplift), value, multiplier).amount();
        prop_assert!(b >= 0.0);
    }

    #[test]
    fn bid_is_monotone_in_uplift(
        a in -1.0..=1.0f64,
        b in -1.0..=1.0f64,
        value in 0.01..1_000.0f64,
        multiplier in 0.1..10.0f64,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let bid_lo = bid(UpliftScore::new(lo), value, multiplier);
        let bid_hi = bid(UpliftScore::new(hi), value, multiplier);
        prop_assert!(bid_lo <= bid_hi);
    }

    #[test]
    fn floor_holds_for_any_history(
        (kp, ki, kd, target) in gains(),
        rates in prop::collection::vec(0.0..5.0f64, 1..200),
    ) {
        let mut pacer = PacingController::new(ControllerConfig::new(kp, ki, kd, target)).unwrap();
        for rate in rates {
            prop_assert!(pacer.update(rate) >= 0.1);
        }
    }

    #[test]
    fn ceiling_holds_for_any_history(
        (kp, ki, kd, target) in gains(),
        ceiling in 1.0..5.0f64,
        rates in prop::collection::vec(0.0..1.0f64, 1..200),
    ) {
        let cfg = ControllerConfig::new(kp, ki, kd, target).with_ceiling(ceiling);
        let mut pacer = PacingController::new(cfg).unwrap();
        for rate in rates {
            let factor = pacer.update(rate);
            prop_assert!((0.1..=ceiling).contains(&factor));
        }
    }

    #[test]
    fn clamped_integral_stays_bounded(
        (kp, ki, kd, target) in gains(),
        limit in 0.0..3.0f64,
        rates in prop::collection::vec(0.0..2.0f64, 1..200),
    ) {
        let cfg = ControllerConfig::new(kp, ki, kd, target)
            .with_anti_windup(AntiWindup::Clamp { limit });
        let mut pacer = PacingController::new(cfg).unwrap();
        for rate in rates {
            pacer.update(rate);
            prop_assert!(pacer.state().integral_error.abs() <= limit);
        }
    }

    #[test]
    fn controllers_are_deterministic(
        (kp, ki, kd, target) in gains(),
        rates in prop::collection::vec(0.0..1.0f64, 1..100),
    ) {
        let cfg = ControllerConfig::new(kp, ki, kd, target);
        let mut a = PacingController::new(cfg.clone()).unwrap();
        let mut b = PacingController::new(cfg).unwrap();
        let out_a: Vec<f64> = rates.iter().map(|r| a.update(*r)).collect();
        let out_b: Vec<f64> = rates.iter().map(|r| b.update(*r)).collect();
        prop_assert_eq!(out_a, out_b);
    }

    #[test]
    fn all_treated_qini_is_zero(
        rows in prop::collection::vec((-1.0..=1.0f64, any::<bool>()), 0..100),
    ) {
        let set: EvaluationSet = rows
            .into_iter()
            .map(|(score, converted)| EvaluationRow::new(score, true, converted))
            .collect();
        let curve = qini_curve(&set).unwrap();
        prop_assert!(curve.values().iter().all(|v| *v == 0.0));
    }
}
