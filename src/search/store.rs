//! Append-only performance store, one JSON record per line

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::record::PerformanceRecord;
use crate::error::{Error, Result};

/// Records of one coin at `<reports_dir>/<coin>_performance.jsonl`
#[derive(Debug, Clone)]
pub struct PerformanceStore {
    path: PathBuf,
}

impl PerformanceStore {
    pub fn open(reports_dir: &Path, coin: &str) -> Self {
        Self {
            path: reports_dir.join(format!("{}_performance.jsonl", coin)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn append(&self, record: &PerformanceRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// All records in insertion order; malformed lines are skipped
    pub fn records(&self) -> Result<Vec<PerformanceRecord>> {
        let file = File::open(&self.path).map_err(|e| Error::from_io(e, &self.path))?;

        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping malformed record at {}:{}: {}",
                    self.path.display(),
                    line_no + 1,
                    e
                ),
            }
        }
        Ok(records)
    }

    /// Latest record for (architecture, trial)
    pub fn find(&self, architecture: &str, model_num: usize) -> Result<Option<PerformanceRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .rev()
            .find(|r| r.architecture == architecture && r.model_num == model_num))
    }

    /// Records passing the accuracy/inaccuracy thresholds, optionally for one architecture
    pub fn promising(
        &self,
        min_accuracy: f64,
        max_inaccuracy: f64,
        architecture: Option<&str>,
    ) -> Result<Vec<PerformanceRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| architecture.map_or(true, |a| r.architecture == a))
            .filter(|r| r.is_promising(min_accuracy, max_inaccuracy))
            .collect())
    }

    /// First unused trial number for an architecture
    pub fn next_model_num(&self, architecture: &str) -> Result<usize> {
        if !self.exists() {
            return Ok(0);
        }
        Ok(self
            .records()?
            .iter()
            .filter(|r| r.architecture == architecture)
            .map(|r| r.model_num + 1)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::AccuracyBreakdown;
    use crate::training::HyperparameterPoint;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(arch: &str, num: usize, exact: f64) -> PerformanceRecord {
        PerformanceRecord {
            model_num: num,
            coin: "eth".to_string(),
            architecture: arch.to_string(),
            hyperparameters: HyperparameterPoint {
                dropout: 0.05,
                learning_rate: 0.0015,
                learning_rate_decay: 0.99991,
            },
            final_train_loss: 1.01,
            min_valid_loss: 1.02,
            accuracy: AccuracyBreakdown {
                exact,
                acceptable: 0.0,
                severe_fail: 1.0 - exact,
                catastrophic_fail: 0.0,
            },
            stopped_early: true,
            epochs_completed: 1,
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_lookup() {
        let dir = tempdir().unwrap();
        let store = PerformanceStore::open(&dir.path().join("reports"), "eth");
        assert_eq!(store.next_model_num("Pi_0").unwrap(), 0);

        store.append(&record("Pi_0", 0, 0.4)).unwrap();
        store.append(&record("Pi_0", 1, 0.7)).unwrap();
        store.append(&record("PC_2", 0, 0.9)).unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!((records[1].model_num, records[1].accuracy.exact), (1, 0.7));

        assert_eq!(store.find("PC_2", 0).unwrap().map(|r| r.accuracy.exact), Some(0.9));
        assert!(store.find("PC_2", 1).unwrap().is_none());
        assert_eq!(store.next_model_num("Pi_0").unwrap(), 2);
        assert_eq!(store.next_model_num("Laptop_0").unwrap(), 0);
    }

    #[test]
    fn test_promising_filter() {
        let dir = tempdir().unwrap();
        let store = PerformanceStore::open(dir.path(), "eth");
        store.append(&record("Pi_0", 0, 0.4)).unwrap();
        store.append(&record("Pi_0", 1, 0.7)).unwrap();
        store.append(&record("PC_2", 0, 0.9)).unwrap();

        assert_eq!(store.promising(0.5, 0.1, None).unwrap().len(), 2);
        let pi = store.promising(0.5, 0.1, Some("Pi_0")).unwrap();
        assert_eq!(pi.len(), 1);
        assert_eq!(pi[0].model_num, 1);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempdir().unwrap();
        let store = PerformanceStore::open(dir.path(), "eth");
        store.append(&record("Pi_0", 0, 0.4)).unwrap();
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_store_is_not_found() {
        let dir = tempdir().unwrap();
        let store = PerformanceStore::open(dir.path(), "nope");
        assert!(store.records().unwrap_err().is_not_found());
    }
}
