//! Model artefacts for the two T-learner arms.
//!
//! Training and calibration run offline; an artefact is the serving-side
//! description of what they produced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::error::{UpliftError, UpliftResult};
use crate::data::domain::FeatureSchema;
use crate::inference::domain::{
    Arm, CalibratedEstimator, IsotonicCalibration, LogisticEstimator, ProbabilityEstimator,
};
use crate::inference::service::UpliftScorer;

/// Estimator technology recorded in an artefact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Logistic(LogisticEstimator),
    CalibratedLogistic {
        base: LogisticEstimator,
        calibration: IsotonicCalibration,
    },
}

impl EstimatorSpec {
    fn base(&self) -> &LogisticEstimator {
        match self {
            EstimatorSpec::Logistic(model) => model,
            EstimatorSpec::CalibratedLogistic { base, .. } => base,
        }
    }
}

/// One arm's estimator plus the schema it was calibrated on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorArtefact {
    pub arm: Arm,
    pub version: String,
    pub schema: FeatureSchema,
    pub estimator: EstimatorSpec,
}

impl EstimatorArtefact {
    /// Check coefficients and schema width before the artefact is served.
    pub fn validate(&self) -> UpliftResult<()> {
        let base = self.estimator.base();
        base.validate()?;
        if let EstimatorSpec::CalibratedLogistic { calibration, .. } = &self.estimator {
            calibration.validate()?;
        }
        if base.n_features() != self.schema.len() {
            return Err(UpliftError::SchemaMismatch {
                expected: self.schema.len(),
                actual: base.n_features(),
            });
        }
        Ok(())
    }

    pub fn build(&self) -> UpliftResult<Arc<dyn ProbabilityEstimator>> {
        self.validate()?;
        let estimator: Arc<dyn ProbabilityEstimator> = match &self.estimator {
            EstimatorSpec::Logistic(model) => Arc::new(model.clone()),
            EstimatorSpec::CalibratedLogistic { base, calibration } => {
                Arc::new(CalibratedEstimator::new(base.clone(), calibration.clone()))
            }
        };
        Ok(estimator)
    }
}

/// Loaded treatment/control pair sharing one feature schema.
#[derive(Clone)]
pub struct TLearner {
    pub schema: FeatureSchema,
    pub treatment_version: String,
    pub control_version: String,
    scorer: UpliftScorer,
}

impl TLearner {
    pub fn from_artefacts(
        treatment: &EstimatorArtefact,
        control: &EstimatorArtefact,
    ) -> UpliftResult<Self> {
        for (expected, artefact) in [(Arm::Treatment, treatment), (Arm::Control, control)] {
            if artefact.arm != expected {
                return Err(UpliftError::invalid_config(format!(
                    "expected a {expected} artefact, found {}",
                    artefact.arm
                )));
            }
        }
        if treatment.schema != control.schema {
            return Err(UpliftError::SchemaMismatch {
                expected: treatment.schema.len(),
                actual: control.schema.len(),
            });
        }
        Ok(Self {
            schema: treatment.schema.clone(),
            treatment_version: treatment.version.clone(),
            control_version: control.version.clone(),
            scorer: UpliftScorer::new(treatment.build()?, control.build()?),
        })
    }

    pub fn scorer(&self) -> UpliftScorer {
        self.scorer.clone()
    }
}

/// Repository contract for model artefacts.
pub trait ModelRepo {
    fn put_artefact(&self, artefact: &EstimatorArtefact) -> UpliftResult<()>;
    fn get_artefact(&self, arm: Arm) -> UpliftResult<EstimatorArtefact>;
}
