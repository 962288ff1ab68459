//! Per-trial performance record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::evaluation::AccuracyBreakdown;
use crate::model::ModelKey;
use crate::training::HyperparameterPoint;

/// Outcome of one grid-search trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub model_num: usize,
    pub coin: String,
    pub architecture: String,
    pub hyperparameters: HyperparameterPoint,
    pub final_train_loss: f64,
    pub min_valid_loss: f64,
    /// Decision quality on the test partition
    pub accuracy: AccuracyBreakdown,
    pub stopped_early: bool,
    pub epochs_completed: usize,
    pub trained_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(&self.coin, &self.architecture, self.model_num)
    }

    /// Exact accuracy above `min_accuracy` and catastrophic rate below `max_inaccuracy`
    pub fn is_promising(&self, min_accuracy: f64, max_inaccuracy: f64) -> bool {
        self.accuracy.exact > min_accuracy && self.accuracy.inaccuracy() < max_inaccuracy
    }
}

impl fmt::Display for PerformanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MODEL {} ({} {})", self.model_num, self.coin, self.architecture)?;
        writeln!(
            f,
            "  train loss {:.6} | min valid loss {:.6}{}",
            self.final_train_loss,
            self.min_valid_loss,
            if self.stopped_early { " | stopped early" } else { "" }
        )?;
        writeln!(f, "  {}", self.hyperparameters)?;
        write!(f, "  {}", self.accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(exact: f64, catastrophic: f64) -> PerformanceRecord {
        PerformanceRecord {
            model_num: 3,
            coin: "bitcoin".to_string(),
            architecture: "Laptop_0".to_string(),
            hyperparameters: HyperparameterPoint {
                dropout: 0.1,
                learning_rate: 0.001,
                learning_rate_decay: 0.9999,
            },
            final_train_loss: 0.9,
            min_valid_loss: 1.0,
            accuracy: AccuracyBreakdown {
                exact,
                acceptable: 0.0,
                severe_fail: 1.0 - exact - catastrophic,
                catastrophic_fail: catastrophic,
            },
            stopped_early: false,
            epochs_completed: 1,
            trained_at: Utc::now(),
        }
    }

    #[test]
    fn test_promising_filter() {
        assert!(record(0.6, 0.05).is_promising(0.5, 0.1));
        assert!(!record(0.5, 0.05).is_promising(0.5, 0.1));
        assert!(!record(0.7, 0.2).is_promising(0.5, 0.1));
    }

    #[test]
    fn test_key_and_summary() {
        let r = record(0.6, 0.05);
        assert_eq!(r.key().file_name(), "bitcoin_Laptop_0_3_mod.json");
        let text = r.to_string();
        assert!(text.contains("MODEL 3"));
        assert!(text.contains("exact 60.00%"));
    }
}
