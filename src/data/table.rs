//! Signal Tables
//!
//! A chronologically ordered table of feature rows with a trailing integer
//! signal column, as produced by the feature pipeline for each coin.

use ndarray::{concatenate, Array2, ArrayView1, Axis};
use std::fs::File;
use std::path::Path;

use super::signal::SignalMode;
use crate::error::{Error, Result};

/// Feature matrix plus one label per row
#[derive(Debug, Clone)]
pub struct SignalTable {
    features: Array2<f64>,
    labels: Vec<usize>,
    mode: SignalMode,
}

impl SignalTable {
    /// Create a table, validating labels against the alphabet
    pub fn new(features: Array2<f64>, labels: Vec<usize>, mode: SignalMode) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }

        if let Some(&label) = labels.iter().find(|&&l| !mode.contains(l)) {
            return Err(Error::InvalidLabel {
                label: label as i64,
                n_classes: mode.n_classes(),
            });
        }

        Ok(Self {
            features,
            labels,
            mode,
        })
    }

    /// Load a table from CSV.
    ///
    /// A header row is optional; when present, a `date` column is ignored.
    /// The first `n_features` remaining columns are features and the last
    /// column is the signal.
    pub fn load_csv<P: AsRef<Path>>(path: P, n_features: usize, mode: SignalMode) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(file);

        let mut date_column = None;
        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;

            if row_idx == 0 && record.iter().any(|f| f.trim().parse::<f64>().is_err()) {
                date_column = record
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case("date"));
                continue;
            }

            let fields: Vec<&str> = record
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != date_column)
                .map(|(_, f)| f.trim())
                .collect();

            if fields.len() < n_features + 1 {
                return Err(Error::ParseError(format!(
                    "{}: row {} has {} columns, expected at least {}",
                    path.display(),
                    row_idx,
                    fields.len(),
                    n_features + 1
                )));
            }

            for field in &fields[..n_features] {
                values.push(parse_number(field, path, row_idx)?);
            }

            let raw_label = parse_number(fields[fields.len() - 1], path, row_idx)?;
            labels.push(to_label(raw_label, mode)?);
        }

        let features = Array2::from_shape_vec((labels.len(), n_features), values)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;

        Self::new(features, labels, mode)
    }

    /// Stack several tables into one, in order
    pub fn concat(tables: &[SignalTable]) -> Result<Self> {
        let first = tables
            .first()
            .ok_or_else(|| Error::InsufficientData("no tables to combine".to_string()))?;

        if let Some(other) = tables
            .iter()
            .find(|t| t.n_features() != first.n_features() || t.mode != first.mode)
        {
            return Err(Error::ShapeMismatch(format!(
                "cannot combine {} ({} features) with {} ({} features)",
                first.mode,
                first.n_features(),
                other.mode,
                other.n_features()
            )));
        }

        let views: Vec<_> = tables.iter().map(|t| t.features.view()).collect();
        let features =
            concatenate(Axis(0), &views).map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        let labels = tables.iter().flat_map(|t| t.labels.iter().copied()).collect();

        Self::new(features, labels, first.mode)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Label alphabet
    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    /// Feature row at `index`
    pub fn features(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }

    /// Label at `index`
    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    /// All labels
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Per-class row counts restricted to `[0, end)`
    pub fn class_counts(&self, end: usize) -> Vec<usize> {
        let mut counts = vec![0; self.mode.n_classes()];
        for &label in &self.labels[..end.min(self.len())] {
            counts[label] += 1;
        }
        counts
    }
}

fn parse_number(field: &str, path: &Path, row: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|_| {
        Error::ParseError(format!(
            "{}: row {} has non-numeric value '{}'",
            path.display(),
            row,
            field
        ))
    })
}

fn to_label(raw: f64, mode: SignalMode) -> Result<usize> {
    if raw.fract() != 0.0 || raw < 0.0 || !mode.contains(raw as usize) {
        return Err(Error::InvalidLabel {
            label: raw as i64,
            n_classes: mode.n_classes(),
        });
    }
    Ok(raw as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_csv_skips_date_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bitcoin_historical_data_complete.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "date,f0,f1,signal").unwrap();
        writeln!(file, "2021-01-01,1.5,2.0,0").unwrap();
        writeln!(file, "2021-01-02,1.6,2.1,2.0").unwrap();
        drop(file);

        let table = SignalTable::load_csv(&path, 2, SignalMode::Ternary).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.n_features(), 2);
        assert_eq!(table.labels(), &[0, 2]);
        assert_eq!(table.features(1)[0], 1.6);
    }

    #[test]
    fn test_load_csv_without_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        std::fs::write(&path, "0.1,0.2,1\n0.3,0.4,2\n0.5,0.6,0\n").unwrap();

        let table = SignalTable::load_csv(&path, 2, SignalMode::Ternary).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.labels(), &[1, 2, 0]);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let dir = tempdir().unwrap();
        let err = SignalTable::load_csv(dir.path().join("nope.csv"), 2, SignalMode::Ternary)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_out_of_alphabet_label_rejected() {
        let err = SignalTable::new(array![[1.0], [2.0]], vec![0, 3], SignalMode::Ternary)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidLabel { label: 3, n_classes: 3 }));
    }

    #[test]
    fn test_concat_and_class_counts() {
        let a = SignalTable::new(array![[1.0], [2.0]], vec![0, 1], SignalMode::Ternary).unwrap();
        let b = SignalTable::new(array![[3.0]], vec![1], SignalMode::Ternary).unwrap();
        let combined = SignalTable::concat(&[a, b]).unwrap();

        assert_eq!(combined.len(), 3);
        assert_eq!(combined.class_counts(3), vec![1, 2, 0]);
        assert_eq!(combined.class_counts(1), vec![1, 0, 0]);
    }
}
