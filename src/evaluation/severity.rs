//! Decision Severity
//!
//! Each prediction falls into exactly one of four buckets, checked in order:
//! exact, acceptable (same decisive side, different magnitude),
//! catastrophic (opposite decisive sides), severe (everything else, i.e.
//! exactly one of decision/truth is hold).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{Dataset, SignalMode, Side};
use crate::error::{Error, Result};
use crate::model::SignalClassifier;

/// Quality of one decision against the ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Exact,
    Acceptable,
    Severe,
    Catastrophic,
}

/// Classify one (decision, truth) pair
pub fn classify(decision: usize, truth: usize, mode: SignalMode) -> Severity {
    if decision == truth {
        return Severity::Exact;
    }

    match (mode.side(decision), mode.side(truth)) {
        (Side::Buy, Side::Buy) | (Side::Sell, Side::Sell) => Severity::Acceptable,
        (Side::Buy, Side::Sell) | (Side::Sell, Side::Buy) => Severity::Catastrophic,
        _ => Severity::Severe,
    }
}

/// Fraction of decisions in each bucket
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccuracyBreakdown {
    pub exact: f64,
    pub acceptable: f64,
    pub severe_fail: f64,
    pub catastrophic_fail: f64,
}

impl AccuracyBreakdown {
    /// Build from per-bucket counts
    pub fn from_counts(exact: usize, acceptable: usize, severe: usize, catastrophic: usize) -> Self {
        let total = (exact + acceptable + severe + catastrophic) as f64;
        if total == 0.0 {
            return Self::default();
        }
        Self {
            exact: exact as f64 / total,
            acceptable: acceptable as f64 / total,
            severe_fail: severe as f64 / total,
            catastrophic_fail: catastrophic as f64 / total,
        }
    }

    /// Fraction of decisions on the wrong decisive side
    pub fn inaccuracy(&self) -> f64 {
        self.catastrophic_fail
    }

    pub fn total(&self) -> f64 {
        self.exact + self.acceptable + self.severe_fail + self.catastrophic_fail
    }
}

impl fmt::Display for AccuracyBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exact {:.2}% | acceptable {:.2}% | severe {:.2}% | catastrophic {:.2}%",
            self.exact * 100.0,
            self.acceptable * 100.0,
            self.severe_fail * 100.0,
            self.catastrophic_fail * 100.0
        )
    }
}

/// Run the model over a dataset and bucket every decision
pub fn evaluate(model: &dyn SignalClassifier, dataset: &Dataset) -> Result<AccuracyBreakdown> {
    if dataset.is_empty() {
        return Err(Error::InsufficientData(
            "cannot evaluate on an empty dataset".to_string(),
        ));
    }

    let mode = dataset.mode();
    if model.n_classes() != mode.n_classes() {
        return Err(Error::ShapeMismatch(format!(
            "model predicts {} classes, dataset uses {}",
            model.n_classes(),
            mode
        )));
    }

    let mut counts = [0usize; 4];
    for point in dataset.iter() {
        if point.features.len() != model.n_features() {
            return Err(Error::ShapeMismatch(format!(
                "model expects {} features, datapoint has {}",
                model.n_features(),
                point.features.len()
            )));
        }
        let decision = model.decide(point.features.view());
        let bucket = match classify(decision, point.label, mode) {
            Severity::Exact => 0,
            Severity::Acceptable => 1,
            Severity::Severe => 2,
            Severity::Catastrophic => 3,
        };
        counts[bucket] += 1;
    }

    Ok(AccuracyBreakdown::from_counts(
        counts[0], counts[1], counts[2], counts[3],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Datapoint;
    use crate::model::{ModelFactory, ModelSpec};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_ternary_buckets() {
        let m = SignalMode::Ternary;
        assert_eq!(classify(0, 0, m), Severity::Exact);
        assert_eq!(classify(0, 2, m), Severity::Catastrophic);
        assert_eq!(classify(2, 0, m), Severity::Catastrophic);
        assert_eq!(classify(1, 2, m), Severity::Severe);
        assert_eq!(classify(0, 1, m), Severity::Severe);
    }

    #[test]
    fn test_granular_acceptable() {
        let m = SignalMode::Quinary;
        assert_eq!(classify(3, 4, m), Severity::Acceptable);
        assert_eq!(classify(0, 1, m), Severity::Acceptable);
        assert_eq!(classify(1, 3, m), Severity::Catastrophic);
        assert_eq!(classify(2, 4, m), Severity::Severe);
    }

    #[test]
    fn test_classification_is_total_and_mirror_symmetric() {
        for mode in [SignalMode::Ternary, SignalMode::Quinary, SignalMode::Septenary] {
            let n = mode.n_classes();
            for decision in 0..n {
                for truth in 0..n {
                    let direct = classify(decision, truth, mode);
                    let mirrored = classify(mode.mirror(decision), mode.mirror(truth), mode);
                    assert_eq!(direct, mirrored, "{} vs {} in {}", decision, truth, mode);
                }
            }
        }
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let b = AccuracyBreakdown::from_counts(3, 1, 4, 2);
        assert_relative_eq!(b.total(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(b.exact, 0.3, epsilon = 1e-12);
        assert_relative_eq!(b.inaccuracy(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_model() {
        let factory = ModelFactory::with_defaults();
        let spec = ModelSpec {
            n_features: 2,
            signal_mode: SignalMode::Ternary,
            dropout: 0.0,
            seed: 3,
        };
        let model = factory.create("Pi_0", &spec).unwrap();
        let data = Dataset::new(
            vec![
                Datapoint::new(array![1.0, 0.0], 0),
                Datapoint::new(array![0.0, 1.0], 1),
                Datapoint::new(array![1.0, 1.0], 2),
            ],
            SignalMode::Ternary,
        );

        let breakdown = evaluate(model.as_ref(), &data).unwrap();
        assert_relative_eq!(breakdown.total(), 1.0, epsilon = 1e-12);

        let empty = Dataset::new(Vec::new(), SignalMode::Ternary);
        assert!(evaluate(model.as_ref(), &empty).is_err());
    }

    #[test]
    fn test_evaluate_rejects_feature_width_mismatch() {
        let factory = ModelFactory::with_defaults();
        let spec = ModelSpec {
            n_features: 3,
            signal_mode: SignalMode::Ternary,
            dropout: 0.0,
            seed: 3,
        };
        let model = factory.create("Pi_0", &spec).unwrap();
        let data = Dataset::new(
            vec![Datapoint::new(array![1.0, 0.0], 0)],
            SignalMode::Ternary,
        );

        assert!(matches!(
            evaluate(model.as_ref(), &data),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
