//! Explicit training state for one model

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::SignalMode;
use crate::error::Result;
use crate::model::{ModelFactory, ModelSpec, SignalClassifier};
use crate::nn::{Adam, CrossEntropyLoss, MultiplicativeDecay, Optimizer};

/// One grid-search cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterPoint {
    pub dropout: f64,
    pub learning_rate: f64,
    pub learning_rate_decay: f64,
}

impl fmt::Display for HyperparameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropout={:.2} eta={:.5} decay={:.5}",
            self.dropout, self.learning_rate, self.learning_rate_decay
        )
    }
}

/// Where tensors live; only the CPU backend exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
}

/// Model, optimizer, scheduler and criterion of a single training run
pub struct TrainingContext {
    pub model: Box<dyn SignalClassifier>,
    pub optimizer: Box<dyn Optimizer>,
    pub scheduler: MultiplicativeDecay,
    pub criterion: CrossEntropyLoss,
    pub device: Device,
    pub rng: StdRng,
    pub hyperparameters: HyperparameterPoint,
}

impl TrainingContext {
    /// Fresh model of the given architecture with Adam and per-step decay
    pub fn new(
        factory: &ModelFactory,
        architecture: &str,
        n_features: usize,
        signal_mode: SignalMode,
        hyperparameters: HyperparameterPoint,
        seed: u64,
    ) -> Result<Self> {
        let spec = ModelSpec {
            n_features,
            signal_mode,
            dropout: hyperparameters.dropout,
            seed,
        };
        let model = factory.create(architecture, &spec)?;
        Ok(Self::from_model(model, hyperparameters, seed))
    }

    /// Wrap an existing (e.g. reloaded) model to continue training it
    pub fn from_model(
        model: Box<dyn SignalClassifier>,
        hyperparameters: HyperparameterPoint,
        seed: u64,
    ) -> Self {
        Self {
            model,
            optimizer: Box::new(Adam::new(hyperparameters.learning_rate)),
            scheduler: MultiplicativeDecay::new(hyperparameters.learning_rate_decay),
            criterion: CrossEntropyLoss,
            device: Device::Cpu,
            // separate stream from the one used for weight init
            rng: StdRng::seed_from_u64(seed.wrapping_add(0x9E37_79B9)),
            hyperparameters,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_uses_hyperparameters() {
        let factory = ModelFactory::with_defaults();
        let hp = HyperparameterPoint {
            dropout: 0.05,
            learning_rate: 0.001,
            learning_rate_decay: 0.9999,
        };
        let ctx = TrainingContext::new(&factory, "Pi_3", 25, SignalMode::Ternary, hp, 42).unwrap();

        assert_eq!(ctx.learning_rate(), 0.001);
        assert_eq!(ctx.scheduler.decay, 0.9999);
        assert_eq!(ctx.model.class_name(), "Pi_3");
        assert_eq!(ctx.device, Device::Cpu);
    }
}
