//! Hyperparameter grid
//!
//! Each axis is either an explicit list or a half-open arithmetic range
//! `[start, stop)` with a fixed step.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::training::HyperparameterPoint;

/// Values along one hyperparameter axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterRange {
    Values(Vec<f64>),
    Arange { start: f64, stop: f64, step: f64 },
}

impl ParameterRange {
    pub fn arange(start: f64, stop: f64, step: f64) -> Self {
        ParameterRange::Arange { start, stop, step }
    }

    pub fn single(value: f64) -> Self {
        ParameterRange::Values(vec![value])
    }

    /// Number of values; the stop bound is excluded
    pub fn len(&self) -> usize {
        match self {
            ParameterRange::Values(values) => values.len(),
            ParameterRange::Arange { start, stop, step } => {
                if *step <= 0.0 || stop <= start {
                    0
                } else {
                    ((stop - start) / step - 1e-9).ceil().max(0.0) as usize
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            ParameterRange::Values(values) => values.clone(),
            ParameterRange::Arange { start, step, .. } => {
                (0..self.len()).map(|i| start + i as f64 * step).collect()
            }
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if let ParameterRange::Arange { step, .. } = self {
            if *step <= 0.0 || !step.is_finite() {
                return Err(Error::ConfigError(format!(
                    "{} range needs a positive step, got {}",
                    name, step
                )));
            }
        }
        if self.is_empty() {
            return Err(Error::ConfigError(format!("{} range is empty", name)));
        }
        Ok(())
    }
}

/// Three independent axes whose Cartesian product is searched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    pub learning_rate: ParameterRange,
    pub learning_rate_decay: ParameterRange,
    pub dropout: ParameterRange,
}

impl Default for HyperparameterGrid {
    fn default() -> Self {
        Self {
            learning_rate: ParameterRange::arange(0.001, 0.002, 0.0005),
            learning_rate_decay: ParameterRange::arange(0.9999, 0.99999, 0.00001),
            dropout: ParameterRange::arange(0.05, 0.85, 0.05),
        }
    }
}

impl HyperparameterGrid {
    pub fn validate(&self) -> Result<()> {
        self.learning_rate.validate("learning_rate")?;
        self.learning_rate_decay.validate("learning_rate_decay")?;
        self.dropout.validate("dropout")
    }

    pub fn len(&self) -> usize {
        self.learning_rate.len() * self.learning_rate_decay.len() * self.dropout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All points; learning rate outermost, dropout innermost
    pub fn points(&self) -> Vec<HyperparameterPoint> {
        let dropouts = self.dropout.values();
        let decays = self.learning_rate_decay.values();

        let mut points = Vec::with_capacity(self.len());
        for learning_rate in self.learning_rate.values() {
            for &learning_rate_decay in &decays {
                for &dropout in &dropouts {
                    points.push(HyperparameterPoint {
                        dropout,
                        learning_rate,
                        learning_rate_decay,
                    });
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_grid_size() {
        let grid = HyperparameterGrid::default();
        assert_eq!(grid.learning_rate.len(), 2);
        assert_eq!(grid.learning_rate_decay.len(), 9);
        assert_eq!(grid.dropout.len(), 16);
        assert_eq!(grid.points().len(), 2 * 9 * 16);
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn test_arange_excludes_stop() {
        let values = ParameterRange::arange(0.05, 0.85, 0.05).values();
        assert_relative_eq!(values[0], 0.05);
        assert_relative_eq!(*values.last().unwrap(), 0.80, epsilon = 1e-12);
    }

    #[test]
    fn test_enumeration_order() {
        let grid = HyperparameterGrid {
            learning_rate: ParameterRange::Values(vec![0.1, 0.2]),
            learning_rate_decay: ParameterRange::single(0.9),
            dropout: ParameterRange::Values(vec![0.3, 0.4]),
        };
        let points = grid.points();
        assert_eq!(points.len(), 4);
        assert_eq!((points[0].learning_rate, points[0].dropout), (0.1, 0.3));
        assert_eq!((points[1].learning_rate, points[1].dropout), (0.1, 0.4));
        assert_eq!((points[2].learning_rate, points[2].dropout), (0.2, 0.3));
    }

    #[test]
    fn test_single_point_is_exact() {
        let grid = HyperparameterGrid {
            learning_rate: ParameterRange::single(0.001),
            learning_rate_decay: ParameterRange::single(0.9999),
            dropout: ParameterRange::single(0.05),
        };
        assert_eq!(
            grid.points(),
            vec![HyperparameterPoint {
                dropout: 0.05,
                learning_rate: 0.001,
                learning_rate_decay: 0.9999,
            }]
        );
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut grid = HyperparameterGrid::default();
        grid.dropout = ParameterRange::arange(0.1, 0.5, 0.0);
        assert!(grid.validate().is_err());
        grid.dropout = ParameterRange::Values(Vec::new());
        assert!(grid.validate().is_err());
    }
}
