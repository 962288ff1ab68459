//! Error types for the signal model library

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A dataset, model or report file does not exist
    #[error("Resource not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Not enough rows to form the requested partitions or statistics
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Architecture identifier missing from the registry
    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),

    /// Persisted weights do not fit the reconstructed model
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Label outside the signal alphabet
    #[error("Invalid label {label} for a {n_classes}-class signal alphabet")]
    InvalidLabel { label: i64, n_classes: usize },

    /// Loss became NaN or infinite
    #[error("Training diverged: {0}")]
    Diverged(String),

    /// Data parsing error
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV reading error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl Error {
    /// Build a not-found error for a path
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Error::NotFound(path.as_ref().to_path_buf())
    }

    /// Map an IO error onto `NotFound` when the file is missing
    pub fn from_io<P: AsRef<Path>>(err: std::io::Error, path: P) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(path)
        } else {
            Error::IoError(err)
        }
    }

    /// Check if the error is a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from_io(io, "models/bitcoin/x.json");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("models/bitcoin/x.json"));
    }

    #[test]
    fn test_other_io_errors_pass_through() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = Error::from_io(io, "reports");
        assert!(matches!(err, Error::IoError(_)));
    }
}
