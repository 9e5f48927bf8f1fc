//! Configuration and state for budget pacing.

use serde::{Deserialize, Serialize};

use crate::bidding::domain::Bid;
use crate::common::error::{UpliftError, UpliftResult};

/// Lowest multiplier the controller will ever emit unless configured otherwise.
pub const DEFAULT_FLOOR: f64 = 0.1;

/// Multiplier a fresh controller starts from.
pub const DEFAULT_INITIAL_ADJUSTMENT: f64 = 1.0;

fn default_floor() -> f64 {
    DEFAULT_FLOOR
}

fn default_initial_adjustment() -> f64 {
    DEFAULT_INITIAL_ADJUSTMENT
}

/// How the integral term is kept in check.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AntiWindup {
    /// Integral accumulates without limit.
    #[default]
    Unbounded,
    /// Integral is clamped to `[-limit, limit]` after each accumulation.
    Clamp { limit: f64 },
    /// Integral is zeroed whenever the floor or ceiling clamp engages.
    ResetOnSaturation,
}

/// Immutable PID configuration, validated once at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Fraction of the budget intended to be spent per time step, in `(0, 1]`.
    pub target_spend_rate: f64,
    #[serde(default = "default_floor")]
    pub floor: f64,
    /// Optional upper clamp on the multiplier. `None` allows unbounded upside.
    #[serde(default)]
    pub ceiling: Option<f64>,
    #[serde(default)]
    pub anti_windup: AntiWindup,
    #[serde(default = "default_initial_adjustment")]
    pub initial_adjustment: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kp: 0.1,
            ki: 0.01,
            kd: 0.05,
            target_spend_rate: 0.1,
            floor: DEFAULT_FLOOR,
            ceiling: None,
            anti_windup: AntiWindup::Unbounded,
            initial_adjustment: DEFAULT_INITIAL_ADJUSTMENT,
        }
    }
}

impl ControllerConfig {
    /// Gains and target with every optional setting at its default.
    pub fn new(kp: f64, ki: f64, kd: f64, target_spend_rate: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            target_spend_rate,
            ..Self::default()
        }
    }

    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.floor = floor;
        self
    }

    pub fn with_anti_windup(mut self, anti_windup: AntiWindup) -> Self {
        self.anti_windup = anti_windup;
        self
    }

    pub fn validate(&self) -> UpliftResult<()> {
        for (name, gain) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(UpliftError::invalid_config(format!(
                    "{name} must be finite and non-negative, got {gain}"
                )));
            }
        }
        if !(self.target_spend_rate > 0.0 && self.target_spend_rate <= 1.0) {
            return Err(UpliftError::invalid_config(format!(
                "target_spend_rate must lie in (0, 1], got {}",
                self.target_spend_rate
            )));
        }
        if !(self.floor.is_finite() && self.floor > 0.0) {
            return Err(UpliftError::invalid_config(format!(
                "floor must be finite and positive, got {}",
                self.floor
            )));
        }
        if let Some(ceiling) = self.ceiling {
            if !ceiling.is_finite() || ceiling < self.floor {
                return Err(UpliftError::invalid_config(format!(
                    "ceiling {ceiling} must be finite and at least the floor {}",
                    self.floor
                )));
            }
        }
        if let AntiWindup::Clamp { limit } = self.anti_windup {
            if !limit.is_finite() || limit < 0.0 {
                return Err(UpliftError::invalid_config(format!(
                    "anti-windup limit must be finite and non-negative, got {limit}"
                )));
            }
        }
        let start = self.initial_adjustment;
        if !start.is_finite()
            || start < self.floor
            || self.ceiling.is_some_and(|ceiling| start > ceiling)
        {
            return Err(UpliftError::invalid_config(format!(
                "initial_adjustment {start} lies outside the clamp range"
            )));
        }
        Ok(())
    }
}

/// Numeric state carried across `update` calls.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PacingState {
    pub integral_error: f64,
    pub last_error: f64,
    pub adjustment_factor: f64,
}

impl PacingState {
    pub fn initial(cfg: &ControllerConfig) -> Self {
        Self {
            integral_error: 0.0,
            last_error: 0.0,
            adjustment_factor: cfg.initial_adjustment,
        }
    }
}

/// Multiplier captured at one point in the update sequence.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PacingSnapshot {
    /// Number of `update` calls applied before the capture.
    pub step: u64,
    pub adjustment_factor: f64,
}

/// Tracks spend against a fixed budget and converts it into per-interval rates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetLedger {
    budget: f64,
    spent_total: f64,
    spent_interval: f64,
    intervals_closed: u64,
}

impl BudgetLedger {
    pub fn new(budget: f64) -> UpliftResult<Self> {
        if !(budget.is_finite() && budget > 0.0) {
            return Err(UpliftError::invalid_config(format!(
                "budget must be finite and positive, got {budget}"
            )));
        }
        Ok(Self {
            budget,
            spent_total: 0.0,
            spent_interval: 0.0,
            intervals_closed: 0,
        })
    }

    pub fn record_spend(&mut self, amount: Bid) {
        self.spent_interval += amount.amount();
        self.spent_total += amount.amount();
    }

    /// Close the running interval and return its spend as a fraction of the budget.
    pub fn close_interval(&mut self) -> f64 {
        let rate = self.spent_interval / self.budget;
        self.spent_interval = 0.0;
        self.intervals_closed += 1;
        rate
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn spent(&self) -> f64 {
        self.spent_total
    }

    pub fn remaining(&self) -> f64 {
        (self.budget - self.spent_total).max(0.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.spent_total >= self.budget
    }

    pub fn intervals_closed(&self) -> u64 {
        self.intervals_closed
    }
}
