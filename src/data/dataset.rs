//! Dataset Partitioning
//!
//! Splits a signal table by position into train/validation/test (70/15/15)
//! and optionally upsamples under-represented classes in the training
//! partition with jittered copies.

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::signal::SignalMode;
use super::table::SignalTable;
use crate::error::{Error, Result};

/// Fraction of rows in the training partition
pub const TRAIN_FRACTION: f64 = 0.70;
/// Fraction of rows in the validation partition
pub const VALID_FRACTION: f64 = 0.15;
/// Half-width of the multiplicative jitter applied to augmented features
pub const AUGMENTATION_NOISE: f64 = 1e-5;

/// One observation and its signal label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Feature vector (fixed length per deployment)
    pub features: Array1<f64>,
    /// Class index into the signal alphabet
    pub label: usize,
    /// True for synthetic points created by augmentation
    pub augmented: bool,
}

impl Datapoint {
    pub fn new(features: Array1<f64>, label: usize) -> Self {
        Self {
            features,
            label,
            augmented: false,
        }
    }

    /// Features as a single-row batch
    pub fn as_batch(&self) -> Array2<f64> {
        self.features.clone().insert_axis(ndarray::Axis(0))
    }
}

/// Ordered collection of datapoints sharing one signal alphabet
#[derive(Debug, Clone)]
pub struct Dataset {
    points: Vec<Datapoint>,
    mode: SignalMode,
}

impl Dataset {
    pub fn new(points: Vec<Datapoint>, mode: SignalMode) -> Self {
        Self { points, mode }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    pub fn points(&self) -> &[Datapoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datapoint> {
        self.points.iter()
    }

    /// Number of synthetic points
    pub fn n_augmented(&self) -> usize {
        self.points.iter().filter(|p| p.augmented).count()
    }

    /// Uniformly random visiting order (Fisher-Yates)
    pub fn shuffled_indices<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.points.len()).collect();
        indices.shuffle(rng);
        indices
    }
}

/// The three positional partitions
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: Dataset,
    pub valid: Dataset,
    pub test: Dataset,
}

/// Row boundaries of the split: `[0, train_end)`, `[train_end, valid_end)`, `[valid_end, n)`
pub fn split_bounds(n_rows: usize) -> Result<(usize, usize)> {
    let train_end = (n_rows as f64 * TRAIN_FRACTION).round() as usize;
    let valid_end = train_end + (n_rows as f64 * VALID_FRACTION).round() as usize;

    if train_end == 0 || valid_end <= train_end || valid_end >= n_rows {
        return Err(Error::InsufficientData(format!(
            "{} rows cannot form non-empty train/validation/test partitions",
            n_rows
        )));
    }

    Ok((train_end, valid_end))
}

/// Split a table into train/validation/test partitions.
///
/// For every original training row, `round(augmentation_factor * ratio)`
/// jittered copies are appended right after it, where `ratio` is the count
/// of the most frequent training class over the count of the row's class.
pub fn build_datasets<R: Rng>(
    table: &SignalTable,
    augmentation_factor: f64,
    rng: &mut R,
) -> Result<DatasetSplits> {
    if augmentation_factor < 0.0 || !augmentation_factor.is_finite() {
        return Err(Error::ConfigError(format!(
            "augmentation factor must be a non-negative number, got {}",
            augmentation_factor
        )));
    }

    let n_rows = table.len();
    let (train_end, valid_end) = split_bounds(n_rows)?;

    let ratios = upsample_ratios(&table.class_counts(train_end));

    let mut train = Vec::new();
    for row in 0..train_end {
        let label = table.label(row);
        let features = table.features(row).to_owned();

        let n_extra = (augmentation_factor * ratios[label]).round() as usize;
        let extras: Vec<Datapoint> = (0..n_extra)
            .map(|_| Datapoint {
                features: jitter(&features, rng),
                label,
                augmented: true,
            })
            .collect();

        train.push(Datapoint::new(features, label));
        train.extend(extras);
    }

    let original_rows = |start: usize, end: usize| -> Vec<Datapoint> {
        (start..end)
            .map(|row| Datapoint::new(table.features(row).to_owned(), table.label(row)))
            .collect()
    };

    let mode = table.mode();
    Ok(DatasetSplits {
        train: Dataset::new(train, mode),
        valid: Dataset::new(original_rows(train_end, valid_end), mode),
        test: Dataset::new(original_rows(valid_end, n_rows), mode),
    })
}

/// `max_count / count` per class; classes absent from the range get 0
fn upsample_ratios(counts: &[usize]) -> Vec<f64> {
    let max_count = counts.iter().copied().max().unwrap_or(0) as f64;
    counts
        .iter()
        .map(|&c| if c > 0 { max_count / c as f64 } else { 0.0 })
        .collect()
}

fn jitter<R: Rng>(features: &Array1<f64>, rng: &mut R) -> Array1<f64> {
    features.mapv(|v| v * (1.0 + rng.gen_range(-AUGMENTATION_NOISE..=AUGMENTATION_NOISE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(labels: Vec<usize>) -> SignalTable {
        let n = labels.len();
        let features = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f64 + 1.0);
        SignalTable::new(features, labels, SignalMode::Ternary).unwrap()
    }

    #[test]
    fn test_split_70_15_15() {
        let t = table(vec![1; 20]);
        let mut rng = StdRng::seed_from_u64(1);
        let splits = build_datasets(&t, 0.0, &mut rng).unwrap();

        assert_eq!(splits.train.len(), 14);
        assert_eq!(splits.valid.len(), 3);
        assert_eq!(splits.test.len(), 3);
        assert_eq!(splits.valid.points()[0].features[0], 14.0 * 3.0 + 1.0);
    }

    #[test]
    fn test_too_few_rows_fails() {
        let t = table(vec![0, 1, 2]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            build_datasets(&t, 0.0, &mut rng),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_augmentation_only_touches_train() {
        // 14 training rows: ten of class 1, four of class 0
        let mut labels = vec![1; 10];
        labels.extend(vec![0; 4]);
        labels.extend(vec![2; 6]);
        let t = table(labels);
        let mut rng = StdRng::seed_from_u64(7);

        let splits = build_datasets(&t, 2.0, &mut rng).unwrap();

        // class 1: ratio 1.0 -> 2 extra each; class 0: ratio 2.5 -> 5 extra each
        let expected_extra = 10 * 2 + 4 * 5;
        assert_eq!(splits.train.n_augmented(), expected_extra);
        assert_eq!(splits.train.len(), 14 + expected_extra);
        assert_eq!(splits.valid.n_augmented(), 0);
        assert_eq!(splits.test.n_augmented(), 0);
        assert_eq!(
            splits.train.len() + splits.valid.len() + splits.test.len(),
            t.len() + expected_extra
        );
    }

    #[test]
    fn test_augmented_points_are_close_to_originals() {
        let t = table(vec![0, 1, 1, 1, 0, 1, 1, 1, 0, 1]);
        let mut rng = StdRng::seed_from_u64(3);
        let splits = build_datasets(&t, 1.0, &mut rng).unwrap();

        let points = splits.train.points();
        for pair in points.windows(2) {
            if pair[1].augmented && !pair[0].augmented {
                assert_eq!(pair[0].label, pair[1].label);
                for (a, b) in pair[0].features.iter().zip(pair[1].features.iter()) {
                    assert!(((b / a) - 1.0).abs() <= AUGMENTATION_NOISE + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_shuffled_indices_is_permutation() {
        let t = table(vec![1; 20]);
        let mut rng = StdRng::seed_from_u64(11);
        let splits = build_datasets(&t, 0.0, &mut rng).unwrap();

        let mut idx = splits.train.shuffled_indices(&mut rng);
        idx.sort_unstable();
        assert_eq!(idx, (0..14).collect::<Vec<_>>());
    }
}
