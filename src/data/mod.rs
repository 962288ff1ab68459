//! Data Module
//!
//! Provides the labelled data the models train on:
//! - Signal alphabet (3/5/7 ordered classes)
//! - Signal tables loaded from the per-coin CSV files
//! - Positional train/validation/test partitioning with class-balancing augmentation

mod dataset;
mod signal;
mod table;

pub use dataset::{
    build_datasets, split_bounds, Datapoint, Dataset, DatasetSplits, AUGMENTATION_NOISE,
    TRAIN_FRACTION, VALID_FRACTION,
};
pub use signal::{SignalMode, Side};
pub use table::SignalTable;
