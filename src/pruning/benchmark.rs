//! Cross-coin benchmarking: score one coin's models on another coin's data

use std::path::{Path, PathBuf};
use tracing::info;

use super::pipeline::{rank_and_select, score_models, ModelScore, PartitionThresholds};
use crate::data::DatasetSplits;
use crate::error::Result;
use crate::model::ModelFactory;

/// Models that transfer to the other coin, best first
#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
    pub qualified: Vec<ModelScore>,
    pub rejected: Vec<ModelScore>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Evaluate every model of `model_coin` on `test_splits`; nothing is deleted
pub fn benchmark_models(
    factory: &ModelFactory,
    models_dir: &Path,
    model_coin: &str,
    test_splits: &DatasetSplits,
    thresholds: &PartitionThresholds,
    parallel: bool,
) -> Result<BenchmarkReport> {
    let (scores, skipped) = score_models(factory, models_dir, model_coin, test_splits, None, parallel)?;

    let (qualified, rejected): (Vec<ModelScore>, Vec<ModelScore>) =
        scores.into_iter().partition(|s| s.accuracy.passes(thresholds));
    let (qualified, _) = rank_and_select(qualified, usize::MAX);

    for score in &qualified {
        info!("{} qualifies\n{}", score, score.accuracy);
    }
    for score in &rejected {
        info!("{} did not meet the thresholds", score.key);
    }

    Ok(BenchmarkReport {
        qualified,
        rejected,
        skipped,
    })
}
