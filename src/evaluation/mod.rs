//! Evaluation Module
//!
//! Buckets model decisions by how far they are from the true signal.

mod severity;

pub use severity::{classify, evaluate, AccuracyBreakdown, Severity};
