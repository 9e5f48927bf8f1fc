// lib.rs - uplift bidding core: scoring, pacing, bidding and offline evaluation
pub mod api;
pub mod bidding;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
pub mod model;
pub mod pacing;

pub use bidding::{Bid, BidEngine, BiddingSession};
pub use common::{AppCfg, ErrorCode, UpliftError, UpliftResult};
pub use data::{FeatureSchema, FeatureVector};
pub use evaluation::{EvaluationRow, EvaluationSet, QiniCurve};
pub use inference::{ProbabilityEstimator, UpliftScore, UpliftScorer};
pub use pacing::{ControllerConfig, PacingController, SharedPacer};
