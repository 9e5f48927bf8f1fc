//! Loading the serving pair and smoke-testing it before traffic arrives.

use serde::Serialize;
use tracing::info;

use crate::common::error::UpliftResult;
use crate::data::domain::FeatureVector;
use crate::inference::domain::Arm;

use super::domain::{ModelRepo, TLearner};

/// Load and validate both arms from the repository.
pub fn load_t_learner(repo: &dyn ModelRepo) -> UpliftResult<TLearner> {
    let treatment = repo.get_artefact(Arm::Treatment)?;
    let control = repo.get_artefact(Arm::Control)?;
    let learner = TLearner::from_artefacts(&treatment, &control)?;
    info!(
        treatment = %learner.treatment_version,
        control = %learner.control_version,
        features = learner.schema.len(),
        "t-learner loaded"
    );
    Ok(learner)
}

/// Per-arm probabilities for a probe vector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Verification {
    pub p_treatment: f64,
    pub p_control: f64,
    pub uplift: f64,
}

/// Score a probe through both arms; any failure surfaces with its arm.
///
/// With no probe given, an all-zero vector of the schema width is used.
pub fn verify(learner: &TLearner, probe: Option<&FeatureVector>) -> UpliftResult<Verification> {
    let zeros;
    let probe = match probe {
        Some(fv) => fv,
        None => {
            zeros = FeatureVector::new(vec![0.0; learner.schema.len()]);
            &zeros
        }
    };
    learner.schema.check(probe)?;
    let scorer = learner.scorer();
    let p_treatment = scorer.arm_probability(Arm::Treatment, probe)?;
    let p_control = scorer.arm_probability(Arm::Control, probe)?;
    let report = Verification {
        p_treatment,
        p_control,
        uplift: p_treatment - p_control,
    };
    info!(p_treatment, p_control, "model smoke test passed");
    Ok(report)
}
