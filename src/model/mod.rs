//! Model domain: T-learner artefacts, their filesystem repository and the
//! load-time smoke test.
//!
//! Artefacts are produced by the offline training job; nothing here trains.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{EstimatorArtefact, EstimatorSpec, ModelRepo, TLearner};
pub use repo_fs::FsModelRepo;
pub use service::{load_t_learner, verify, Verification};
