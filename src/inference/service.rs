//! Uplift scoring over a treatment/control estimator pair.

use std::sync::Arc;

use tracing::warn;

use crate::common::error::{UpliftError, UpliftResult};
use crate::data::domain::FeatureVector;

use super::domain::{Arm, EstimateError, ProbabilityEstimator, UpliftScore};

/// Score one vector with both arms and return `p_t - p_c`.
pub fn score(
    fv: &FeatureVector,
    treatment: &dyn ProbabilityEstimator,
    control: &dyn ProbabilityEstimator,
) -> UpliftResult<UpliftScore> {
    let p_t = probability(Arm::Treatment, treatment, fv)?;
    let p_c = probability(Arm::Control, control, fv)?;
    Ok(UpliftScore::from_probabilities(p_t, p_c))
}

fn probability(
    arm: Arm,
    estimator: &dyn ProbabilityEstimator,
    fv: &FeatureVector,
) -> UpliftResult<f64> {
    match estimator.score(fv) {
        Ok(p) if (0.0..=1.0).contains(&p) => Ok(p),
        Ok(p) => Err(UpliftError::EstimationFailed {
            arm,
            reason: format!("probability {p} outside [0, 1]"),
        }),
        Err(EstimateError::SchemaMismatch { expected, actual }) => {
            Err(UpliftError::SchemaMismatch { expected, actual })
        }
        Err(EstimateError::Inference(reason)) => {
            warn!(arm = %arm, %reason, "estimator inference failed");
            Err(UpliftError::EstimationFailed { arm, reason })
        }
    }
}

/// T-learner scorer holding shared handles to both arms.
#[derive(Clone)]
pub struct UpliftScorer {
    treatment: Arc<dyn ProbabilityEstimator>,
    control: Arc<dyn ProbabilityEstimator>,
}

impl UpliftScorer {
    pub fn new(
        treatment: Arc<dyn ProbabilityEstimator>,
        control: Arc<dyn ProbabilityEstimator>,
    ) -> Self {
        Self { treatment, control }
    }

    pub fn score(&self, fv: &FeatureVector) -> UpliftResult<UpliftScore> {
        score(fv, self.treatment.as_ref(), self.control.as_ref())
    }

    /// Score every vector independently; one failure never hides the others.
    pub fn score_batch(&self, fvs: &[FeatureVector]) -> Vec<UpliftResult<UpliftScore>> {
        fvs.iter().map(|fv| self.score(fv)).collect()
    }

    /// Treatment-arm probability alone, used by the propensity baseline.
    pub fn propensity(&self, fv: &FeatureVector) -> UpliftResult<f64> {
        probability(Arm::Treatment, self.treatment.as_ref(), fv)
    }

    /// Probability from a single arm.
    pub fn arm_probability(&self, arm: Arm, fv: &FeatureVector) -> UpliftResult<f64> {
        match arm {
            Arm::Treatment => probability(arm, self.treatment.as_ref(), fv),
            Arm::Control => probability(arm, self.control.as_ref(), fv),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Returns the same probability for any vector of the expected width.
    pub(crate) struct Fixed {
        pub(crate) p: f64,
        pub(crate) width: usize,
    }

    impl ProbabilityEstimator for Fixed {
        fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
            if fv.len() != self.width {
                return Err(EstimateError::SchemaMismatch {
                    expected: self.width,
                    actual: fv.len(),
                });
            }
            Ok(self.p)
        }
    }

    /// Probability equal to the first feature; fails on negative input.
    pub(crate) struct FirstFeature;

    impl ProbabilityEstimator for FirstFeature {
        fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
            match fv.get(0) {
                Some(x) if x >= 0.0 => Ok(x),
                Some(x) => Err(EstimateError::Inference(format!("negative input {x}"))),
                None => Err(EstimateError::SchemaMismatch {
                    expected: 1,
                    actual: 0,
                }),
            }
        }
    }

    pub(crate) fn fixed_scorer(p_t: f64, p_c: f64, width: usize) -> UpliftScorer {
        UpliftScorer::new(
            Arc::new(Fixed { p: p_t, width }),
            Arc::new(Fixed { p: p_c, width }),
        )
    }
}
