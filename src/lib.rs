//! # Neural Trading Signals for Cryptocurrencies
//!
//! Feed-forward classifiers that map a day's feature vector to an ordered
//! trading signal (sell ... hold ... buy), together with the tooling around
//! them: hyperparameter grid search with early stopping, severity-aware
//! evaluation, pruning of persisted models, cross-coin benchmarking and a
//! Monte Carlo portfolio allocator.
//!
//! ## Modules
//!
//! - `data`: Signal alphabet, CSV tables, train/validation/test partitions
//! - `nn`: Dense layers, dropout, cross-entropy loss, Adam and LR decay
//! - `model`: Classifier trait, architecture registry, weight persistence
//! - `training`: Training context, checkpointed loop, early stopping
//! - `evaluation`: Four-bucket severity breakdown
//! - `search`: Hyperparameter grid, performance records and their store
//! - `pruning`: Per-partition filtering, ranking, deletion, benchmarking
//! - `portfolio`: Return statistics and Monte Carlo weight search
//! - `utils`: Configuration and logging
//!
//! ## Example
//!
//! ```no_run
//! use nn_signal_crypto::{
//!     build_datasets, Config, GridSearch, ModelFactory, SignalTable,
//! };
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let table = SignalTable::load_csv(
//!         config.data.dataset_path("bitcoin"),
//!         config.data.n_features,
//!         config.data.signal_mode,
//!     )?;
//!     let mut rng = StdRng::seed_from_u64(config.training.seed);
//!     let splits = build_datasets(&table, config.data.augmentation_factor, &mut rng)?;
//!
//!     let factory = ModelFactory::with_defaults();
//!     let search = GridSearch::new(&factory, "bitcoin", "Pi_0", &config.search, &config.training);
//!     let summary = search.run(&splits)?;
//!     if let Some(best) = summary.best() {
//!         println!("{}", best);
//!     }
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod nn;
pub mod portfolio;
pub mod pruning;
pub mod search;
pub mod training;
pub mod utils;

// Re-export main types for convenience
pub use data::{build_datasets, Dataset, DatasetSplits, SignalMode, SignalTable};
pub use error::{Error, Result};
pub use evaluation::{evaluate, AccuracyBreakdown, Severity};
pub use model::{FeedForwardClassifier, ModelFactory, ModelKey, SignalClassifier};
pub use portfolio::{MonteCarloOptimizer, Objective, PortfolioOptimization, ReturnStatistics};
pub use pruning::{benchmark_models, prune_models, BenchmarkReport, PruningReport};
pub use search::{GridSearch, HyperparameterGrid, PerformanceRecord, PerformanceStore};
pub use training::{train, EarlyStoppingPolicy, HyperparameterPoint, TrainingContext};
pub use utils::{setup_logging, Config};
