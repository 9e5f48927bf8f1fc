//! Error handling primitives shared across the core.
//!
//! Every failure a caller can act on gets its own variant; the matching
//! [`ErrorCode`] is what crosses the FFI boundary.

use thiserror::Error;

use crate::inference::domain::Arm;

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Feature vector shape disagrees with the estimator schema.
    SchemaMismatch = 1,
    /// An estimator could not produce a probability.
    EstimationFailed = 2,
    /// AUUC is undefined for the supplied evaluation set.
    DegenerateEvaluation = 3,
    /// Configuration rejected at construction time.
    InvalidConfig = 4,
    /// Requested model artefact was not available.
    ModelMissing = 5,
    /// Input failed validation.
    InvalidInput = 6,
    /// Filesystem failure.
    Io = 7,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum UpliftError {
    #[error("schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("{arm} estimator failed: {reason}")]
    EstimationFailed { arm: Arm, reason: String },

    #[error("degenerate evaluation over {rows} rows: final qini value is zero")]
    DegenerateEvaluation { rows: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("model artefact missing: {0}")]
    ModelMissing(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type UpliftResult<T> = Result<T, UpliftError>;

impl UpliftError {
    /// Configuration helper.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Validation helper.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::EstimationFailed { .. } => ErrorCode::EstimationFailed,
            Self::DegenerateEvaluation { .. } => ErrorCode::DegenerateEvaluation,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::ModelMissing(_) => ErrorCode::ModelMissing,
            Self::InvalidInput(_) | Self::Json(_) => ErrorCode::InvalidInput,
            Self::Io(_) => ErrorCode::Io,
        }
    }
}
