//! Inference domain: estimator capability, uplift scoring and the worker
//! helpers used to score many impressions at once.

pub mod domain;
pub mod service;
pub mod workers;

pub use domain::{
    Arm, CalibratedEstimator, EstimateError, IsotonicCalibration, LogisticEstimator,
    ProbabilityEstimator, UpliftScore,
};
pub use service::UpliftScorer;
