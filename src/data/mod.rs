//! Feature vectors and the schemas estimators are calibrated against.
//!
//! Encoding and feature engineering happen upstream; this module only fixes
//! the width and column order every scoring call agrees on.

pub mod domain;

pub use domain::{FeatureSchema, FeatureVector};
