//! Training Module
//!
//! - `TrainingContext`: model, optimizer, scheduler and criterion of one run
//! - Per-datapoint training with periodic validation checkpoints
//! - Windowed early stopping on checkpoint training losses

mod context;
mod early_stopping;
mod engine;

pub use context::{Device, HyperparameterPoint, TrainingContext};
pub use early_stopping::{
    should_stop, Baseline, EarlyStopping, EarlyStoppingPolicy, StopRule, StopTrigger,
};
pub use engine::{train, train_epoch, validate, Checkpoint, TrainingTrace};
