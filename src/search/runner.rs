//! Grid search driver
//!
//! Trials are numbered from the first unused trial number of the
//! architecture in the store, so reruns never overwrite earlier models.
//! A failing trial is logged and skipped; its number is not reused.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use super::grid::HyperparameterGrid;
use super::record::PerformanceRecord;
use super::store::PerformanceStore;
use crate::data::DatasetSplits;
use crate::error::{Error, Result};
use crate::evaluation::{evaluate, AccuracyBreakdown};
use crate::model::{read_snapshot, save_model, ModelFactory, ModelKey, ModelSpec};
use crate::training::{train, HyperparameterPoint, TrainingContext, TrainingTrace};
use crate::utils::{SearchConfig, TrainingConfig};

/// A trial that did not produce a record
#[derive(Debug, Clone, PartialEq)]
pub struct TrialFailure {
    pub model_num: usize,
    pub hyperparameters: HyperparameterPoint,
    pub error: String,
}

/// Everything a search produced, in trial order
#[derive(Debug, Clone, Default)]
pub struct SearchSummary {
    pub records: Vec<PerformanceRecord>,
    pub failures: Vec<TrialFailure>,
}

impl SearchSummary {
    /// Record with the highest exact accuracy
    pub fn best(&self) -> Option<&PerformanceRecord> {
        self.records
            .iter()
            .max_by(|a, b| a.accuracy.exact.total_cmp(&b.accuracy.exact))
    }
}

/// Grid search over one coin and one architecture
pub struct GridSearch<'a> {
    factory: &'a ModelFactory,
    coin: String,
    architecture: String,
    grid: HyperparameterGrid,
    training: TrainingConfig,
    models_dir: PathBuf,
    store: PerformanceStore,
    parallel: bool,
}

impl<'a> GridSearch<'a> {
    pub fn new(
        factory: &'a ModelFactory,
        coin: &str,
        architecture: &str,
        search: &SearchConfig,
        training: &TrainingConfig,
    ) -> Self {
        Self {
            factory,
            coin: coin.to_string(),
            architecture: architecture.to_string(),
            grid: search.grid.clone(),
            training: training.clone(),
            models_dir: search.models_dir.clone(),
            store: PerformanceStore::open(&search.reports_dir, coin),
            parallel: search.parallel,
        }
    }

    pub fn store(&self) -> &PerformanceStore {
        &self.store
    }

    /// Train, persist, evaluate and record one model per grid point
    pub fn run(&self, splits: &DatasetSplits) -> Result<SearchSummary> {
        self.grid.validate()?;
        if !self.factory.contains(&self.architecture) {
            return Err(Error::UnknownArchitecture(self.architecture.clone()));
        }

        let first = self.store.next_model_num(&self.architecture)?;
        let jobs: Vec<(usize, HyperparameterPoint)> = self
            .grid
            .points()
            .into_iter()
            .enumerate()
            .map(|(i, hp)| (first + i, hp))
            .collect();

        info!(
            "Grid search for {} {}: {} trials starting at #{}",
            self.coin,
            self.architecture,
            jobs.len(),
            first
        );

        let mut summary = SearchSummary::default();
        if self.parallel {
            let outcomes: Vec<_> = jobs
                .par_iter()
                .map(|&(model_num, hp)| (model_num, hp, self.run_trial(model_num, hp, splits)))
                .collect();
            for (model_num, hp, outcome) in outcomes {
                self.finish_trial(model_num, hp, outcome, &mut summary)?;
            }
        } else {
            for &(model_num, hp) in &jobs {
                let outcome = self.run_trial(model_num, hp, splits);
                self.finish_trial(model_num, hp, outcome, &mut summary)?;
            }
        }

        info!(
            "Grid search finished: {} records, {} failed trials",
            summary.records.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    fn run_trial(
        &self,
        model_num: usize,
        hyperparameters: HyperparameterPoint,
        splits: &DatasetSplits,
    ) -> Result<PerformanceRecord> {
        info!("Trial #{}: {}", model_num, hyperparameters);

        let mut ctx = TrainingContext::new(
            self.factory,
            &self.architecture,
            n_features(splits),
            splits.train.mode(),
            hyperparameters,
            self.training.seed.wrapping_add(model_num as u64),
        )?;
        let trace = train(&mut ctx, &splits.train, &splits.valid, &self.training)?;

        let key = ModelKey::new(&self.coin, &self.architecture, model_num);
        save_model(&self.models_dir, &key, ctx.model.as_ref())?;

        let accuracy = evaluate(ctx.model.as_ref(), &splits.test)?;
        Ok(build_record(&key, hyperparameters, &trace, accuracy))
    }

    fn finish_trial(
        &self,
        model_num: usize,
        hyperparameters: HyperparameterPoint,
        outcome: Result<PerformanceRecord>,
        summary: &mut SearchSummary,
    ) -> Result<()> {
        match outcome {
            Ok(record) => {
                self.store.append(&record)?;
                info!("Trial #{} done: {}", model_num, record.accuracy);
                summary.records.push(record);
            }
            Err(e) => {
                warn!("Trial #{} ({}) failed: {}", model_num, hyperparameters, e);
                summary.failures.push(TrialFailure {
                    model_num,
                    hyperparameters,
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Resume training a persisted model with new hyperparameters,
/// overwrite its weights and record the result
pub fn continue_training(
    factory: &ModelFactory,
    models_dir: &Path,
    store: &PerformanceStore,
    key: &ModelKey,
    hyperparameters: HyperparameterPoint,
    splits: &DatasetSplits,
    training: &TrainingConfig,
) -> Result<PerformanceRecord> {
    let snapshot = read_snapshot(&key.path(models_dir))?;
    let spec = ModelSpec {
        n_features: snapshot.network.input_size,
        signal_mode: snapshot.signal_mode,
        dropout: hyperparameters.dropout,
        seed: training.seed,
    };
    let mut model = factory.create(&snapshot.architecture, &spec)?;
    model.load_snapshot(&snapshot)?;
    info!("Continuing {} with {}", key, hyperparameters);

    let mut ctx = TrainingContext::from_model(
        model,
        hyperparameters,
        training.seed.wrapping_add(key.trial as u64),
    );
    let trace = train(&mut ctx, &splits.train, &splits.valid, training)?;
    save_model(models_dir, key, ctx.model.as_ref())?;

    let accuracy = evaluate(ctx.model.as_ref(), &splits.test)?;
    let record = build_record(key, hyperparameters, &trace, accuracy);
    store.append(&record)?;
    info!("{}", record);
    Ok(record)
}

fn build_record(
    key: &ModelKey,
    hyperparameters: HyperparameterPoint,
    trace: &TrainingTrace,
    accuracy: AccuracyBreakdown,
) -> PerformanceRecord {
    PerformanceRecord {
        model_num: key.trial,
        coin: key.coin.clone(),
        architecture: key.architecture.clone(),
        hyperparameters,
        final_train_loss: trace.final_train_loss(),
        min_valid_loss: trace.min_valid_loss,
        accuracy,
        stopped_early: trace.stopped_early(),
        epochs_completed: trace.epochs_completed,
        trained_at: Utc::now(),
    }
}

fn n_features(splits: &DatasetSplits) -> usize {
    splits
        .train
        .points()
        .first()
        .map(|p| p.features.len())
        .unwrap_or(0)
}
