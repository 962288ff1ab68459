//! Architecture registry
//!
//! Maps architecture identifiers to constructors. The built-in table holds
//! single-hidden-layer variants sized for small to mid-sized machines plus
//! two two-layer variants; `Hidden_<width>` builds a single hidden layer of
//! any width without registration.

use std::collections::BTreeMap;

use super::classifier::{FeedForwardClassifier, SignalClassifier};
use crate::data::SignalMode;
use crate::error::{Error, Result};

/// Prefix of dynamically sized single-layer identifiers
pub const HIDDEN_PREFIX: &str = "Hidden_";

/// Per-instance construction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub n_features: usize,
    pub signal_mode: SignalMode,
    pub dropout: f64,
    pub seed: u64,
}

pub type ModelConstructor = Box<dyn Fn(&ModelSpec) -> Box<dyn SignalClassifier> + Send + Sync>;

/// Registry of architecture identifiers
pub struct ModelFactory {
    constructors: BTreeMap<String, ModelConstructor>,
}

/// Hidden-layer widths of the built-in architectures
pub fn builtin_architectures() -> Vec<(String, Vec<usize>)> {
    let mut table = Vec::new();
    for (i, width) in (5..=12).enumerate() {
        table.push((format!("Pi_{}", i), vec![width]));
    }
    for (i, width) in (13..=19).enumerate() {
        table.push((format!("PC_{}", i), vec![width]));
    }
    for (i, width) in (20..=24).enumerate() {
        table.push((format!("Laptop_{}", i), vec![width]));
    }
    table.push(("Laptop_5".to_string(), vec![20, 13]));
    table.push(("Laptop_6".to_string(), vec![21, 13]));
    table
}

impl ModelFactory {
    /// Empty registry (only `Hidden_<width>` resolves)
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with all built-in architectures
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        for (id, hidden) in builtin_architectures() {
            factory.register_layers(&id, hidden);
        }
        factory
    }

    /// Register (or replace) a constructor
    pub fn register<F>(&mut self, id: &str, constructor: F)
    where
        F: Fn(&ModelSpec) -> Box<dyn SignalClassifier> + Send + Sync + 'static,
    {
        self.constructors.insert(id.to_string(), Box::new(constructor));
    }

    /// Register a feedforward architecture by its hidden widths
    pub fn register_layers(&mut self, id: &str, hidden_sizes: Vec<usize>) {
        let name = id.to_string();
        self.register(id, move |spec| {
            Box::new(FeedForwardClassifier::new(
                &name,
                spec.n_features,
                &hidden_sizes,
                spec.signal_mode,
                spec.dropout,
                spec.seed,
            ))
        });
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id) || parse_hidden_width(id).is_some()
    }

    /// Registered identifiers, sorted
    pub fn architectures(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build a fresh, untrained model
    pub fn create(&self, id: &str, spec: &ModelSpec) -> Result<Box<dyn SignalClassifier>> {
        if !(0.0..1.0).contains(&spec.dropout) {
            return Err(Error::ConfigError(format!(
                "dropout must lie in [0, 1), got {}",
                spec.dropout
            )));
        }

        if let Some(constructor) = self.constructors.get(id) {
            return Ok(constructor(spec));
        }

        match parse_hidden_width(id) {
            Some(width) => Ok(Box::new(FeedForwardClassifier::new(
                id,
                spec.n_features,
                &[width],
                spec.signal_mode,
                spec.dropout,
                spec.seed,
            ))),
            None => Err(Error::UnknownArchitecture(id.to_string())),
        }
    }
}

impl Default for ModelFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_hidden_width(id: &str) -> Option<usize> {
    id.strip_prefix(HIDDEN_PREFIX)?
        .parse::<usize>()
        .ok()
        .filter(|&w| w > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ModelSpec {
        ModelSpec {
            n_features: 25,
            signal_mode: SignalMode::Ternary,
            dropout: 0.05,
            seed: 42,
        }
    }

    #[test]
    fn test_builtin_table() {
        let factory = ModelFactory::with_defaults();
        assert_eq!(factory.architectures().len(), 8 + 7 + 7);

        let pi = factory.create("Pi_0", &spec()).unwrap();
        assert_eq!(pi.num_parameters(), 25 * 5 + 5 + 5 * 3 + 3);

        let laptop = factory.create("Laptop_5", &spec()).unwrap();
        assert_eq!(laptop.num_parameters(), 25 * 20 + 20 + 20 * 13 + 13 + 13 * 3 + 3);
        assert_eq!(laptop.class_name(), "Laptop_5");
    }

    #[test]
    fn test_dynamic_hidden_width() {
        let factory = ModelFactory::new();
        let model = factory.create("Hidden_30", &spec()).unwrap();
        assert_eq!(model.num_parameters(), 25 * 30 + 30 + 30 * 3 + 3);
        assert!(factory.contains("Hidden_30"));
        assert!(!factory.contains("Hidden_0"));
    }

    #[test]
    fn test_unknown_architecture() {
        let factory = ModelFactory::with_defaults();
        assert!(matches!(
            factory.create("Mainframe_0", &spec()),
            Err(Error::UnknownArchitecture(_))
        ));
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        let factory = ModelFactory::with_defaults();
        let mut bad = spec();
        bad.dropout = 1.0;
        assert!(matches!(factory.create("Pi_0", &bad), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_custom_registration() {
        let mut factory = ModelFactory::new();
        factory.register_layers("Tiny", vec![2]);
        let model = factory.create("Tiny", &spec()).unwrap();
        assert_eq!(model.num_parameters(), 25 * 2 + 2 + 2 * 3 + 3);
    }
}
