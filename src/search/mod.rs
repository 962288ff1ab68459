//! Hyperparameter Search Module
//!
//! Enumerates (learning rate, decay, dropout) grids, trains one model per
//! point and keeps a structured record of each trial.

mod grid;
mod record;
mod runner;
mod store;

pub use crate::training::HyperparameterPoint;
pub use grid::{HyperparameterGrid, ParameterRange};
pub use record::PerformanceRecord;
pub use runner::{continue_training, GridSearch, SearchSummary, TrialFailure};
pub use store::PerformanceStore;
