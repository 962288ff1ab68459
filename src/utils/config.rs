//! Configuration management
//!
//! Every section has a `Default` carrying the values the pipeline was tuned
//! with, so a missing or partial TOML file still yields a runnable setup.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::{build_datasets, DatasetSplits, SignalMode, SignalTable};
use crate::portfolio::PortfolioConstraints;
use crate::pruning::PartitionThresholds;
use crate::search::HyperparameterGrid;
use crate::training::EarlyStoppingPolicy;

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub n_features: usize,
    pub signal_mode: SignalMode,
    /// Jittered copies per training row, scaled by class imbalance
    pub augmentation_factor: f64,
    pub dataset_dir: PathBuf,
    pub raw_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            n_features: 25,
            signal_mode: SignalMode::Ternary,
            augmentation_factor: 0.0,
            dataset_dir: PathBuf::from("datasets/complete"),
            raw_dir: PathBuf::from("datasets/raw"),
        }
    }
}

/// Dataset name used when several coin tables are merged
pub const COMBINED_DATASET: &str = "combined";

/// What a set of partitions is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPurpose {
    /// Training partition gets the configured augmentation
    Training,
    /// Pruning and benchmarking score the original rows only
    Evaluation,
}

impl DataConfig {
    /// `<dataset_dir>/<coin>_historical_data_complete.csv`
    pub fn dataset_path(&self, coin: &str) -> PathBuf {
        self.dataset_dir
            .join(format!("{}_historical_data_complete.csv", coin))
    }

    /// Load one coin's table, or the merged tables of several coins
    pub fn load_table(&self, coins: &[String]) -> Result<(String, SignalTable)> {
        let tables = coins
            .iter()
            .map(|coin| {
                let path = self.dataset_path(coin);
                SignalTable::load_csv(&path, self.n_features, self.signal_mode)
                    .with_context(|| format!("Failed to load dataset {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        match tables.len() {
            0 => bail!("no coins given"),
            1 => {
                let table = tables.into_iter().next().context("no table loaded")?;
                Ok((coins[0].clone(), table))
            }
            _ => Ok((COMBINED_DATASET.to_string(), SignalTable::concat(&tables)?)),
        }
    }

    /// Load and partition datasets; evaluation splits are never augmented
    pub fn load_splits(
        &self,
        coins: &[String],
        purpose: SplitPurpose,
        seed: u64,
    ) -> Result<(String, DatasetSplits)> {
        let (name, table) = self.load_table(coins)?;
        info!("{}: {} rows, {} features", name, table.len(), table.n_features());

        let augmentation = match purpose {
            SplitPurpose::Training => self.augmentation_factor,
            SplitPurpose::Evaluation => 0.0,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let splits = build_datasets(&table, augmentation, &mut rng)?;
        info!(
            "Partitions: train {} ({} augmented), valid {}, test {}",
            splits.train.len(),
            splits.train.n_augmented(),
            splits.valid.len(),
            splits.test.len()
        );
        Ok((name, splits))
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub architecture: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: "Laptop_0".to_string(),
        }
    }
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Steps between validation checkpoints
    pub batch_interval: usize,
    pub epochs: usize,
    pub seed: u64,
    pub early_stopping: EarlyStoppingPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_interval: 256,
            epochs: 1,
            seed: 42,
            early_stopping: EarlyStoppingPolicy::default(),
        }
    }
}

/// Grid search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: HyperparameterGrid,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: HyperparameterGrid::default(),
            models_dir: PathBuf::from("models"),
            reports_dir: PathBuf::from("reports"),
            parallel: false,
        }
    }
}

/// Pruning and benchmarking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    pub thresholds: PartitionThresholds,
    pub max_retained: usize,
    /// Thresholds a model must beat on another coin's data
    pub benchmark_thresholds: PartitionThresholds,
    /// Record filter: exact accuracy strictly above this
    pub promising_accuracy: f64,
    /// Record filter: catastrophic rate strictly below this
    pub max_inaccuracy: f64,
    pub parallel: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            thresholds: PartitionThresholds {
                train: 0.5,
                valid: 0.4,
                test: 0.4,
            },
            max_retained: 10,
            benchmark_thresholds: PartitionThresholds {
                train: 0.5,
                valid: 0.1,
                test: 0.4,
            },
            promising_accuracy: 0.5,
            max_inaccuracy: 0.1,
            parallel: false,
        }
    }
}

/// Monte Carlo allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub coins: Vec<String>,
    /// Periods per year, also the length of the price window
    pub interval: usize,
    pub n_simulations: usize,
    pub constraints: PortfolioConstraints,
    pub seed: u64,
    pub parallel: bool,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            coins: ["algorand", "bitcoin", "cardano", "ethereum", "solana"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            interval: 365,
            n_simulations: 1_000_000,
            constraints: PortfolioConstraints::default(),
            seed: 42,
            parallel: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub search: SearchConfig,
    pub pruning: PruningConfig,
    pub portfolio: PortfolioConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        Config::default().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.n_features, 25);
        assert_eq!(config.model.architecture, "Laptop_0");
        assert_eq!(config.training.batch_interval, 256);
        assert_eq!(config.portfolio.coins.len(), 5);
        assert_eq!(config.search.grid.len(), 2 * 9 * 16);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.data.signal_mode = SignalMode::Quinary;
        config.pruning.max_retained = 3;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.data.signal_mode, SignalMode::Quinary);
        assert_eq!(loaded.pruning.max_retained, 3);
        assert_eq!(loaded.search.grid, config.search.grid);
        assert_eq!(loaded.training.early_stopping, config.training.early_stopping);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[training]\nepochs = 3\n\n[portfolio]\ncoins = [\"bitcoin\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_interval, 256);
        assert_eq!(config.portfolio.coins, vec!["bitcoin".to_string()]);
        assert_eq!(config.portfolio.interval, 365);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.search.models_dir, PathBuf::from("models"));
    }

    fn write_dataset(dir: &Path, coin: &str) {
        let mut csv = String::from("date,f0,f1,signal\n");
        for i in 0..20 {
            let label = if i % 5 == 0 { 0 } else { 1 };
            csv.push_str(&format!("2021-01-{:02},{},{},{}\n", i + 1, i, i * 2, label));
        }
        std::fs::write(dir.join(format!("{}_historical_data_complete.csv", coin)), csv).unwrap();
    }

    fn augmented_data_config(dir: &Path) -> DataConfig {
        DataConfig {
            n_features: 2,
            augmentation_factor: 2.0,
            dataset_dir: dir.to_path_buf(),
            ..DataConfig::default()
        }
    }

    #[test]
    fn test_evaluation_splits_are_not_augmented() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "bitcoin");
        let data = augmented_data_config(dir.path());
        let coins = vec!["bitcoin".to_string()];

        let (_, training) = data.load_splits(&coins, SplitPurpose::Training, 1).unwrap();
        assert!(training.train.n_augmented() > 0);

        let (name, evaluation) = data.load_splits(&coins, SplitPurpose::Evaluation, 1).unwrap();
        assert_eq!(name, "bitcoin");
        assert_eq!(evaluation.train.n_augmented(), 0);
        assert_eq!(evaluation.train.len(), 14);
    }

    #[test]
    fn test_several_coins_are_combined() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "bitcoin");
        write_dataset(dir.path(), "ethereum");
        let data = augmented_data_config(dir.path());

        let coins = vec!["bitcoin".to_string(), "ethereum".to_string()];
        let (name, table) = data.load_table(&coins).unwrap();
        assert_eq!(name, COMBINED_DATASET);
        assert_eq!(table.len(), 40);
        assert!(data.load_table(&[]).is_err());
    }

    #[test]
    fn test_dataset_path() {
        let data = DataConfig::default();
        assert_eq!(
            data.dataset_path("bitcoin"),
            PathBuf::from("datasets/complete/bitcoin_historical_data_complete.csv")
        );
    }
}
