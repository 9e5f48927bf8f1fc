//! Bid computation and the serving session that ties scoring to pacing.

pub mod domain;
pub mod service;

pub use domain::{BatchOutcome, Bid, BidStrategy, ImpressionBid, ImpressionFailure};
pub use service::{BidEngine, BiddingSession};
