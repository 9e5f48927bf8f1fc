//! Core feature definitions shared by estimators and the scorer.

use serde::{Deserialize, Serialize};

use crate::common::error::{UpliftError, UpliftResult};

/// Columns served to the v2 T-learner: the raw Criteo features followed by the
/// engineered frequency, quadratic and interaction terms.
const CRITEO_V2_COLUMNS: [&str; 18] = [
    "f0",
    "f1",
    "f2",
    "f3",
    "f4",
    "f5",
    "f6",
    "f7",
    "f8",
    "f9",
    "f10",
    "f11",
    "user_freq",
    "f3_sq",
    "f8_sq",
    "f6_sq",
    "f3_f6_inter",
    "f2_f9_inter",
];

/// Ordered list of feature names an estimator was calibrated on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated column lists.
    pub fn new<I, S>(names: I) -> UpliftResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(UpliftError::invalid_config("feature schema is empty"));
        }
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) {
                return Err(UpliftError::invalid_config(format!(
                    "duplicate feature `{name}` in schema"
                )));
            }
        }
        Ok(Self { names })
    }

    /// Schema of the v2 engineered dataset.
    pub fn criteo_v2() -> Self {
        Self {
            names: CRITEO_V2_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a named column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Fail with `SchemaMismatch` when the vector width differs from the schema.
    pub fn check(&self, fv: &FeatureVector) -> UpliftResult<()> {
        if fv.len() == self.len() {
            Ok(())
        } else {
            Err(UpliftError::SchemaMismatch {
                expected: self.len(),
                actual: fv.len(),
            })
        }
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = UpliftError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(value: FeatureSchema) -> Self {
        value.names
    }
}

/// One scoring unit (impression / user context). Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Box<[f64]>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for FeatureVector {
    fn from(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }
}
