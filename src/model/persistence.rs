//! Model weight snapshots on disk
//!
//! Layout: `<models_dir>/<coin>/<coin>_<architecture>_<trial>_mod.json`.
//! File names are parsed relative to the coin directory they live in.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::classifier::{ModelSnapshot, SignalClassifier};
use super::registry::{ModelFactory, ModelSpec};
use crate::error::{Error, Result};

const FILE_SUFFIX: &str = "_mod.json";

/// Identity of one persisted model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey {
    pub coin: String,
    pub architecture: String,
    pub trial: usize,
}

impl ModelKey {
    pub fn new(coin: &str, architecture: &str, trial: usize) -> Self {
        Self {
            coin: coin.to_string(),
            architecture: architecture.to_string(),
            trial,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}_{}{}", self.coin, self.architecture, self.trial, FILE_SUFFIX)
    }

    /// Recover the key from a snapshot file name of `coin`.
    /// Everything between the coin prefix and the trial number is the
    /// architecture, so identifiers with any number of underscores parse.
    pub fn parse(file_name: &str, coin: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(FILE_SUFFIX)?
            .strip_prefix(coin)?
            .strip_prefix('_')?;
        let (architecture, trial) = stem.rsplit_once('_')?;
        if architecture.is_empty() {
            return None;
        }

        Some(Self {
            coin: coin.to_string(),
            architecture: architecture.to_string(),
            trial: trial.parse().ok()?,
        })
    }

    /// Full path below the models root
    pub fn path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(&self.coin).join(self.file_name())
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} #{}", self.coin, self.architecture, self.trial)
    }
}

/// Write a model's weights; returns the file path
pub fn save_model(models_dir: &Path, key: &ModelKey, model: &dyn SignalClassifier) -> Result<PathBuf> {
    let path = key.path(models_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(writer, &model.snapshot())?;

    debug!("Saved {} to {}", key, path.display());
    Ok(path)
}

/// Read a snapshot file
pub fn read_snapshot(path: &Path) -> Result<ModelSnapshot> {
    let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Rebuild a model through the factory and load its persisted weights
pub fn load_model(factory: &ModelFactory, path: &Path) -> Result<Box<dyn SignalClassifier>> {
    let snapshot = read_snapshot(path)?;
    let spec = ModelSpec {
        n_features: snapshot.network.input_size,
        signal_mode: snapshot.signal_mode,
        dropout: snapshot.network.dropout,
        seed: 0,
    };

    let mut model = factory.create(&snapshot.architecture, &spec)?;
    model.load_snapshot(&snapshot)?;
    Ok(model)
}

/// All snapshot files of a coin, sorted by path.
/// Files whose names do not parse are skipped.
pub fn list_models(models_dir: &Path, coin: &str) -> Result<Vec<(PathBuf, ModelKey)>> {
    let dir = models_dir.join(coin);
    let entries = fs::read_dir(&dir).map_err(|e| Error::from_io(e, &dir))?;

    let mut models = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| ModelKey::parse(n, coin));

        match key {
            Some(key) => models.push((path, key)),
            None => debug!("Skipping unrecognized file {}", path.display()),
        }
    }

    models.sort();
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SignalMode;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_file_name_roundtrip() {
        let key = ModelKey::new("bitcoin", "Laptop_5", 12);
        assert_eq!(key.file_name(), "bitcoin_Laptop_5_12_mod.json");
        assert_eq!(ModelKey::parse(&key.file_name(), "bitcoin"), Some(key));

        let multi = ModelKey::new("bitcoin_cash", "Hidden_30", 0);
        assert_eq!(ModelKey::parse(&multi.file_name(), "bitcoin_cash"), Some(multi));

        let custom = ModelKey::new("btc", "Tiny", 4);
        assert_eq!(ModelKey::parse(&custom.file_name(), "btc"), Some(custom));

        let nested = ModelKey::new("btc", "Wide_Deep_2", 7);
        assert_eq!(ModelKey::parse(&nested.file_name(), "btc"), Some(nested));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert_eq!(ModelKey::parse("notes.txt", "btc"), None);
        assert_eq!(ModelKey::parse("eth_Pi_0_3_mod.json", "btc"), None);
        assert_eq!(ModelKey::parse("btc_3_mod.json", "btc"), None);
        assert_eq!(ModelKey::parse("btc_Pi_0_x_mod.json", "btc"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let factory = ModelFactory::with_defaults();
        let spec = ModelSpec {
            n_features: 3,
            signal_mode: SignalMode::Ternary,
            dropout: 0.3,
            seed: 5,
        };
        let model = factory.create("PC_0", &spec).unwrap();
        let key = ModelKey::new("eth", "PC_0", 1);

        let path = save_model(dir.path(), &key, model.as_ref()).unwrap();
        assert!(path.ends_with("eth/eth_PC_0_1_mod.json"));

        let restored = load_model(&factory, &path).unwrap();
        let x = array![[0.1, 0.2, 0.3]];
        assert_eq!(model.infer(&x), restored.infer(&x));

        let listed = list_models(dir.path(), "eth").unwrap();
        assert_eq!(listed, vec![(path, key)]);
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = tempdir().unwrap();
        let factory = ModelFactory::with_defaults();
        let err = load_model(&factory, &dir.path().join("x_Pi_0_0_mod.json")).err().unwrap();
        assert!(err.is_not_found());
        assert!(list_models(dir.path(), "nothing").unwrap_err().is_not_found());
    }
}
