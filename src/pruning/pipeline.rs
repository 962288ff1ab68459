//! Model Pruning
//!
//! Re-evaluates every persisted model of a coin on the three partitions,
//! keeps those whose exact accuracy beats every partition threshold, ranks
//! them by mean exact accuracy and deletes rejected and excess files once
//! all evaluations are complete.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::data::DatasetSplits;
use crate::error::Result;
use crate::evaluation::{evaluate, AccuracyBreakdown};
use crate::model::{list_models, load_model, ModelFactory, ModelKey, SignalClassifier};
use crate::search::PerformanceStore;
use crate::training::HyperparameterPoint;
use crate::utils::PruningConfig;

/// Minimum exact accuracy per partition (strictly exceeded to pass)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionThresholds {
    pub train: f64,
    pub valid: f64,
    pub test: f64,
}

/// Breakdown of one model on each partition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionAccuracy {
    pub train: AccuracyBreakdown,
    pub valid: AccuracyBreakdown,
    pub test: AccuracyBreakdown,
}

impl PartitionAccuracy {
    /// Unweighted mean of the exact accuracies
    pub fn composite(&self) -> f64 {
        (self.train.exact + self.valid.exact + self.test.exact) / 3.0
    }

    pub fn passes(&self, thresholds: &PartitionThresholds) -> bool {
        self.train.exact > thresholds.train
            && self.valid.exact > thresholds.valid
            && self.test.exact > thresholds.test
    }
}

impl fmt::Display for PartitionAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  train: {}", self.train)?;
        writeln!(f, "  valid: {}", self.valid)?;
        write!(f, "  test:  {}", self.test)
    }
}

/// Evaluate a model against all three partitions
pub fn evaluate_partitions(
    model: &dyn SignalClassifier,
    splits: &DatasetSplits,
) -> Result<PartitionAccuracy> {
    Ok(PartitionAccuracy {
        train: evaluate(model, &splits.train)?,
        valid: evaluate(model, &splits.valid)?,
        test: evaluate(model, &splits.test)?,
    })
}

/// A persisted model with its evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub path: PathBuf,
    pub key: ModelKey,
    pub accuracy: PartitionAccuracy,
    pub hyperparameters: Option<HyperparameterPoint>,
}

impl ModelScore {
    pub fn score(&self) -> f64 {
        self.accuracy.composite()
    }
}

impl fmt::Display for ModelScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}% avg accuracy)", self.key, self.score() * 100.0)?;
        if let Some(hp) = &self.hyperparameters {
            write!(f, " [{}]", hp)?;
        }
        Ok(())
    }
}

/// Sort descending by composite score (ties by path) and split at `max_retained`
pub fn rank_and_select(
    mut candidates: Vec<ModelScore>,
    max_retained: usize,
) -> (Vec<ModelScore>, Vec<ModelScore>) {
    candidates.sort_by(|a, b| {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| a.path.cmp(&b.path))
    });
    let excess = candidates.split_off(max_retained.min(candidates.len()));
    (candidates, excess)
}

/// Why a model file was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    BelowThreshold,
    Excess,
}

/// Outcome of one deletion attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub path: PathBuf,
    pub reason: PruneReason,
    /// Set when the file could not be removed
    pub error: Option<String>,
}

/// Result of pruning one coin
#[derive(Debug, Clone, Default)]
pub struct PruningReport {
    /// Survivors, best first
    pub retained: Vec<ModelScore>,
    pub deleted: Vec<Deletion>,
    /// Files that could not be loaded or evaluated, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl PruningReport {
    pub fn best(&self) -> Option<&ModelScore> {
        self.retained.first()
    }

    pub fn n_removed(&self) -> usize {
        self.deleted.iter().filter(|d| d.error.is_none()).count()
    }

    pub fn deletion_failures(&self) -> impl Iterator<Item = &Deletion> {
        self.deleted.iter().filter(|d| d.error.is_some())
    }
}

/// Load and score every model file of a coin; unreadable files are skipped
pub fn score_models(
    factory: &ModelFactory,
    models_dir: &Path,
    coin: &str,
    splits: &DatasetSplits,
    store: Option<&PerformanceStore>,
    parallel: bool,
) -> Result<(Vec<ModelScore>, Vec<(PathBuf, String)>)> {
    let files = list_models(models_dir, coin)?;

    let score_one = |(path, key): &(PathBuf, ModelKey)| -> (PathBuf, Result<ModelScore>) {
        let scored = load_model(factory, path).and_then(|model| {
            let accuracy = evaluate_partitions(model.as_ref(), splits)?;
            let hyperparameters = store
                .and_then(|s| s.find(&key.architecture, key.trial).ok().flatten())
                .map(|r| r.hyperparameters);
            Ok(ModelScore {
                path: path.clone(),
                key: key.clone(),
                accuracy,
                hyperparameters,
            })
        });
        (path.clone(), scored)
    };

    let outcomes: Vec<(PathBuf, Result<ModelScore>)> = if parallel {
        files.par_iter().map(score_one).collect()
    } else {
        files.iter().map(score_one).collect()
    };

    let mut scores = Vec::new();
    let mut skipped = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(score) => scores.push(score),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped.push((path, e.to_string()));
            }
        }
    }
    Ok((scores, skipped))
}

/// Evaluate, rank and prune the persisted models of one coin
pub fn prune_models(
    factory: &ModelFactory,
    models_dir: &Path,
    coin: &str,
    splits: &DatasetSplits,
    store: Option<&PerformanceStore>,
    config: &PruningConfig,
) -> Result<PruningReport> {
    let (scores, skipped) = score_models(factory, models_dir, coin, splits, store, config.parallel)?;
    let total = scores.len() + skipped.len();

    let (passing, failing): (Vec<ModelScore>, Vec<ModelScore>) = scores
        .into_iter()
        .partition(|s| s.accuracy.passes(&config.thresholds));

    for score in &passing {
        info!("{} had satisfactory performance", score);
        debug!("\n{}", score.accuracy);
    }
    for score in &failing {
        info!("{} did not meet the thresholds", score.key);
    }

    let (retained, excess) = rank_and_select(passing, config.max_retained);

    let doomed = failing
        .iter()
        .map(|s| (&s.path, PruneReason::BelowThreshold))
        .chain(excess.iter().map(|s| (&s.path, PruneReason::Excess)));

    let mut deleted = Vec::new();
    for (path, reason) in doomed {
        let error = match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed {}", path.display());
                None
            }
            Err(e) => {
                warn!("Could not remove {}: {}", path.display(), e);
                Some(e.to_string())
            }
        };
        deleted.push(Deletion {
            path: path.clone(),
            reason,
            error,
        });
    }

    let report = PruningReport {
        retained,
        deleted,
        skipped,
    };

    if total > 0 {
        info!(
            "{} models removed [{:.2}% of {}]",
            report.n_removed(),
            report.n_removed() as f64 / total as f64 * 100.0,
            total
        );
    }
    match report.best() {
        Some(best) => info!("Most reliable model: {}", best),
        None => info!("{} had no models make the cut", coin),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown(exact: f64) -> AccuracyBreakdown {
        AccuracyBreakdown {
            exact,
            acceptable: 0.0,
            severe_fail: 1.0 - exact,
            catastrophic_fail: 0.0,
        }
    }

    fn score(name: &str, exact: f64) -> ModelScore {
        ModelScore {
            path: PathBuf::from(name),
            key: ModelKey::new("btc", "Pi_0", 0),
            accuracy: PartitionAccuracy {
                train: breakdown(exact),
                valid: breakdown(exact),
                test: breakdown(exact),
            },
            hyperparameters: None,
        }
    }

    #[test]
    fn test_rank_keeps_top_scores() {
        let candidates = vec![score("a", 0.9), score("b", 0.5), score("c", 0.95)];
        let (kept, excess) = rank_and_select(candidates, 2);

        let kept: Vec<&str> = kept.iter().map(|s| s.path.to_str().unwrap()).collect();
        assert_eq!(kept, vec!["c", "a"]);
        assert_eq!(excess.len(), 1);
        assert_eq!(excess[0].path, PathBuf::from("b"));
    }

    #[test]
    fn test_rank_with_room_for_all() {
        let (kept, excess) = rank_and_select(vec![score("a", 0.6), score("b", 0.6)], 10);
        assert_eq!(kept.len(), 2);
        assert!(excess.is_empty());
        assert_eq!(kept[0].path, PathBuf::from("a"));
    }

    #[test]
    fn test_thresholds_are_strict() {
        let thresholds = PartitionThresholds {
            train: 0.5,
            valid: 0.4,
            test: 0.4,
        };
        assert!(score("a", 0.6).accuracy.passes(&thresholds));
        assert!(!score("a", 0.4).accuracy.passes(&thresholds));

        let mut s = score("a", 0.6);
        s.accuracy.valid = breakdown(0.4);
        assert!(!s.accuracy.passes(&thresholds));
    }

    #[test]
    fn test_composite_is_mean() {
        let mut s = score("a", 0.9);
        s.accuracy.valid = breakdown(0.6);
        s.accuracy.test = breakdown(0.3);
        assert!((s.score() - 0.6).abs() < 1e-12);
    }
}
