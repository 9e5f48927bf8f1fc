//! Domain definitions for probability estimators and uplift scores.
//!
//! Estimators are opaque scoring functions produced by the offline training
//! job. The serving core only needs `score`, so the capability is a one-method
//! trait and the concrete kinds below are what the model artefacts describe.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::error::{UpliftError, UpliftResult};
use crate::data::domain::FeatureVector;

/// Treatment arm an estimator was trained on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    Treatment,
    Control,
}

impl Arm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Treatment => "treatment",
            Arm::Control => "control",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure surface of a single estimator call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
    #[error("{0}")]
    Inference(String),
}

/// Calibrated conversion-probability estimator.
pub trait ProbabilityEstimator: Send + Sync {
    /// Probability of conversion for `fv`, expected in `[0, 1]`.
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError>;
}

impl<E: ProbabilityEstimator + ?Sized> ProbabilityEstimator for &E {
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
        (**self).score(fv)
    }
}

impl<E: ProbabilityEstimator + ?Sized> ProbabilityEstimator for Box<E> {
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
        (**self).score(fv)
    }
}

impl<E: ProbabilityEstimator + ?Sized> ProbabilityEstimator for Arc<E> {
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
        (**self).score(fv)
    }
}

/// Estimated incremental conversion probability, `p_t - p_c`.
///
/// Lies in `[-1, 1]` and is negative when treatment is predicted to hurt.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize)]
pub struct UpliftScore(f64);

impl UpliftScore {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn from_probabilities(p_treatment: f64, p_control: f64) -> Self {
        Self(p_treatment - p_control)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Linear model with a logistic link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticEstimator {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticEstimator {
    pub fn new(weights: Vec<f64>, intercept: f64) -> UpliftResult<Self> {
        let model = Self { weights, intercept };
        model.validate()?;
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Reject empty or non-finite coefficients; artefacts are checked after load.
    pub fn validate(&self) -> UpliftResult<()> {
        if self.weights.is_empty() {
            return Err(UpliftError::invalid_config("logistic model has no weights"));
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(UpliftError::invalid_config(
                "logistic model has non-finite coefficients",
            ));
        }
        Ok(())
    }
}

impl ProbabilityEstimator for LogisticEstimator {
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
        if fv.len() != self.weights.len() {
            return Err(EstimateError::SchemaMismatch {
                expected: self.weights.len(),
                actual: fv.len(),
            });
        }
        let logit = self
            .weights
            .iter()
            .zip(fv.as_slice())
            .fold(self.intercept, |acc, (w, x)| acc + w * x);
        if !logit.is_finite() {
            return Err(EstimateError::Inference(format!(
                "non-finite logit {logit}"
            )));
        }
        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}

/// Monotone piecewise-linear map fitted by isotonic regression.
///
/// Inputs outside the fitted range are clipped to the end points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsotonicCalibration {
    thresholds: Vec<f64>,
    values: Vec<f64>,
}

impl IsotonicCalibration {
    pub fn new(thresholds: Vec<f64>, values: Vec<f64>) -> UpliftResult<Self> {
        let map = Self { thresholds, values };
        map.validate()?;
        Ok(map)
    }

    pub fn validate(&self) -> UpliftResult<()> {
        if self.thresholds.is_empty() || self.thresholds.len() != self.values.len() {
            return Err(UpliftError::invalid_config(
                "isotonic calibration needs matching, non-empty thresholds and values",
            ));
        }
        let sorted = |xs: &[f64]| xs.windows(2).all(|w| w[0] <= w[1]);
        if !sorted(&self.thresholds) || !sorted(&self.values) {
            return Err(UpliftError::invalid_config(
                "isotonic calibration must be non-decreasing",
            ));
        }
        if self.thresholds.iter().any(|x| !x.is_finite())
            || self.values.iter().any(|y| !(0.0..=1.0).contains(y))
        {
            return Err(UpliftError::invalid_config(
                "isotonic calibration values must be probabilities",
            ));
        }
        Ok(())
    }

    pub fn apply(&self, raw: f64) -> f64 {
        let hi = self.thresholds.partition_point(|&t| t < raw);
        if hi == 0 {
            return self.values[0];
        }
        if hi == self.thresholds.len() {
            return self.values[hi - 1];
        }
        let (x0, x1) = (self.thresholds[hi - 1], self.thresholds[hi]);
        let (y0, y1) = (self.values[hi - 1], self.values[hi]);
        if x1 <= x0 {
            return y1;
        }
        y0 + (raw - x0) * (y1 - y0) / (x1 - x0)
    }
}

/// Base estimator whose output is passed through an isotonic calibration map.
#[derive(Clone, Debug)]
pub struct CalibratedEstimator<E> {
    base: E,
    calibration: IsotonicCalibration,
}

impl<E: ProbabilityEstimator> CalibratedEstimator<E> {
    pub fn new(base: E, calibration: IsotonicCalibration) -> Self {
        Self { base, calibration }
    }
}

impl<E: ProbabilityEstimator> ProbabilityEstimator for CalibratedEstimator<E> {
    fn score(&self, fv: &FeatureVector) -> Result<f64, EstimateError> {
        let raw = self.base.score(fv)?;
        Ok(self.calibration.apply(raw))
    }
}
