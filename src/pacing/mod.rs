//! Budget pacing: the PID controller, its configuration and the spend ledger
//! that produces the observed rates it consumes.

pub mod domain;
pub mod service;

pub use domain::{AntiWindup, BudgetLedger, ControllerConfig, PacingSnapshot, PacingState};
pub use service::{PacingController, SharedPacer};
