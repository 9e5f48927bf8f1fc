//! Offline evaluation of uplift rankings (Qini curve, AUUC).
//!
//! Runs on a closed batch that an external pipeline has already joined with
//! treatment and conversion labels. Plotting stays with the caller.

pub mod domain;
pub mod service;

pub use domain::{
    ArmScoredRow, EvaluationRow, EvaluationSet, QiniCurve, QiniReport, StrategyComparison,
};
pub use service::{compare_strategies, evaluate, qini_curve, report};
