//! Bid computation and the per-time-step serving session.

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{UpliftError, UpliftResult};
use crate::data::domain::FeatureVector;
use crate::inference::domain::UpliftScore;
use crate::inference::service::UpliftScorer;
use crate::inference::workers::parallel_map;
use crate::pacing::domain::{BudgetLedger, PacingSnapshot};
use crate::pacing::service::{PacingController, SharedPacer};

use super::domain::{BatchOutcome, Bid, BidStrategy, ImpressionBid, ImpressionFailure};

/// `max(0, uplift * conversion_value * multiplier)`.
///
/// A negative raw value never turns positive: the multiplier scales the
/// decision but cannot flip its sign. Non-positive conversion values yield
/// zero bids rather than errors.
pub fn bid(uplift: UpliftScore, conversion_value: f64, multiplier: f64) -> Bid {
    scaled(uplift.value(), conversion_value, multiplier)
}

fn scaled(score: f64, conversion_value: f64, multiplier: f64) -> Bid {
    let raw = score * conversion_value;
    Bid::new(raw.max(0.0) * multiplier.max(0.0))
}

/// Stateless bid calculator holding the value of one incremental conversion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BidEngine {
    conversion_value: f64,
}

impl BidEngine {
    pub fn new(conversion_value: f64) -> Self {
        Self { conversion_value }
    }

    pub fn conversion_value(&self) -> f64 {
        self.conversion_value
    }

    pub fn bid(&self, uplift: UpliftScore, multiplier: f64) -> Bid {
        bid(uplift, self.conversion_value, multiplier)
    }

    /// Bid on a treated conversion probability (propensity baseline).
    pub fn bid_propensity(&self, p_treatment: f64, multiplier: f64) -> Bid {
        scaled(p_treatment, self.conversion_value, multiplier)
    }
}

/// One budget period of serving: a shared pacer plus the scoring pipeline.
pub struct BiddingSession {
    scorer: UpliftScorer,
    engine: BidEngine,
    pacer: SharedPacer,
    ledger: Option<Mutex<BudgetLedger>>,
    strategy: BidStrategy,
    workers: usize,
}

impl BiddingSession {
    pub fn new(scorer: UpliftScorer, engine: BidEngine, controller: PacingController) -> Self {
        Self {
            scorer,
            engine,
            pacer: SharedPacer::new(controller),
            ledger: None,
            strategy: BidStrategy::default(),
            workers: 1,
        }
    }

    /// Build a session from validated configuration.
    pub fn from_config(cfg: &AppCfg, scorer: UpliftScorer) -> UpliftResult<Self> {
        let controller = PacingController::new(cfg.controller.clone())?;
        let mut session = Self::new(scorer, BidEngine::new(cfg.conversion_value), controller)
            .with_strategy(cfg.strategy)
            .with_workers(cfg.workers);
        if let Some(budget) = cfg.budget {
            session = session.with_ledger(BudgetLedger::new(budget)?);
        }
        Ok(session)
    }

    pub fn with_strategy(mut self, strategy: BidStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_ledger(mut self, ledger: BudgetLedger) -> Self {
        self.ledger = Some(Mutex::new(ledger));
        self
    }

    pub fn pacer(&self) -> &SharedPacer {
        &self.pacer
    }

    pub fn strategy(&self) -> BidStrategy {
        self.strategy
    }

    /// Feed the spend rate realised since the last update to the controller.
    pub fn observe(&self, observed_spend_rate: f64) -> PacingSnapshot {
        self.pacer.update(observed_spend_rate)
    }

    /// Score and bid on every impression against one multiplier snapshot.
    pub fn bid_batch(&self, impressions: &[FeatureVector]) -> BatchOutcome {
        let snapshot = self.pacer.snapshot();
        let multiplier = snapshot.adjustment_factor;
        let results = parallel_map(impressions, self.workers, |_, fv| {
            self.decide(fv, multiplier)
        });

        let mut bids = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok((score, bid)) => bids.push(ImpressionBid { index, score, bid }),
                Err(error) => {
                    warn!(index, code = error.code() as u32, %error, "impression skipped");
                    failures.push(ImpressionFailure { index, error });
                }
            }
        }

        let outcome = BatchOutcome {
            snapshot,
            bids,
            failures,
        };
        info!(
            step = snapshot.step,
            multiplier,
            impressions = impressions.len(),
            positive = outcome.positive_bids(),
            failed = outcome.failures.len(),
            total_bid = outcome.total_bid(),
            "batch bid"
        );
        outcome
    }

    /// Update the pacer with the observed rate, then bid on the batch.
    pub fn step(&self, observed_spend_rate: f64, impressions: &[FeatureVector]) -> BatchOutcome {
        self.observe(observed_spend_rate);
        self.bid_batch(impressions)
    }

    /// Book realised spend (e.g. a won auction) against the budget ledger.
    pub fn record_spend(&self, amount: Bid) -> UpliftResult<()> {
        let ledger = self.ledger()?;
        ledger.lock().record_spend(amount);
        Ok(())
    }

    /// Close the ledger interval and feed its spend rate to the controller.
    pub fn close_interval(&self) -> UpliftResult<PacingSnapshot> {
        let rate = self.ledger()?.lock().close_interval();
        Ok(self.observe(rate))
    }

    /// Copy of the budget ledger, when one is attached.
    pub fn ledger_snapshot(&self) -> Option<BudgetLedger> {
        self.ledger.as_ref().map(|ledger| ledger.lock().clone())
    }

    fn ledger(&self) -> UpliftResult<&Mutex<BudgetLedger>> {
        self.ledger
            .as_ref()
            .ok_or_else(|| UpliftError::invalid_config("session has no budget ledger"))
    }

    fn decide(&self, fv: &FeatureVector, multiplier: f64) -> UpliftResult<(f64, Bid)> {
        match self.strategy {
            BidStrategy::Uplift => {
                let uplift = self.scorer.score(fv)?;
                Ok((uplift.value(), self.engine.bid(uplift, multiplier)))
            }
            BidStrategy::Propensity => {
                let p = self.scorer.propensity(fv)?;
                Ok((p, self.engine.bid_propensity(p, multiplier)))
            }
        }
    }
}
