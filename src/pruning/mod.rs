//! Pruning Module
//!
//! Retention of persisted models by per-partition accuracy, plus
//! cross-coin benchmarking of the survivors.

mod benchmark;
mod pipeline;

pub use benchmark::{benchmark_models, BenchmarkReport};
pub use pipeline::{
    evaluate_partitions, prune_models, rank_and_select, score_models, Deletion, ModelScore,
    PartitionAccuracy, PartitionThresholds, PruneReason, PruningReport,
};
