//! Domain types for bids and per-batch bidding outcomes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::UpliftError;
use crate::pacing::domain::PacingSnapshot;

/// Non-negative monetary amount offered for one impression.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize)]
pub struct Bid(f64);

impl Bid {
    pub const ZERO: Bid = Bid(0.0);

    /// Negative and NaN amounts collapse to zero.
    pub fn new(amount: f64) -> Self {
        Self(amount.max(0.0))
    }

    pub fn amount(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

/// What the monetary value of a conversion is multiplied by.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStrategy {
    /// Bid on the incremental probability `p_t - p_c`.
    #[default]
    Uplift,
    /// Bid on the treated conversion probability alone (baseline agent).
    Propensity,
}

impl FromStr for BidStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uplift" => Ok(Self::Uplift),
            "propensity" => Ok(Self::Propensity),
            other => Err(format!("unknown bid strategy `{other}`")),
        }
    }
}

/// Successful bid for the impression at `index` in the submitted batch.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ImpressionBid {
    pub index: usize,
    /// Score the bid was derived from (uplift or propensity, per strategy).
    pub score: f64,
    pub bid: Bid,
}

/// Scoring failure for the impression at `index`.
#[derive(Debug)]
pub struct ImpressionFailure {
    pub index: usize,
    pub error: UpliftError,
}

/// Result of bidding on one batch of impressions against a single snapshot.
#[derive(Debug)]
pub struct BatchOutcome {
    pub snapshot: PacingSnapshot,
    pub bids: Vec<ImpressionBid>,
    pub failures: Vec<ImpressionFailure>,
}

impl BatchOutcome {
    pub fn total_bid(&self) -> f64 {
        self.bids.iter().map(|b| b.bid.amount()).sum()
    }

    pub fn positive_bids(&self) -> usize {
        self.bids.iter().filter(|b| !b.bid.is_zero()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
