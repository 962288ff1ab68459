//! Signal classifier capability set and the feedforward implementation

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::data::SignalMode;
use crate::error::{Error, Result};
use crate::nn::{argmax, DenseLayer, LayerGradient, LayerParams, Mode, NetworkConfig, NeuralNetwork};

/// Everything needed to rebuild a trained classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub architecture: String,
    pub signal_mode: SignalMode,
    pub network: NetworkConfig,
    pub layers: Vec<DenseLayer>,
}

/// A trainable model mapping feature vectors to logits over the signal alphabet
pub trait SignalClassifier: Send {
    /// Architecture identifier this model was built from
    fn class_name(&self) -> &str;

    fn signal_mode(&self) -> SignalMode;

    fn n_features(&self) -> usize;

    /// Mode-aware forward pass (dropout active in train mode)
    fn forward(&mut self, input: &Array2<f64>) -> Array2<f64>;

    /// Gradient-free forward pass with dropout disabled
    fn infer(&self, input: &Array2<f64>) -> Array2<f64>;

    /// Backpropagate the logits gradient of the last `forward`
    fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<Vec<LayerGradient>>;

    fn parameters_mut(&mut self) -> Vec<LayerParams<'_>>;

    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    fn num_parameters(&self) -> usize;

    fn snapshot(&self) -> ModelSnapshot;

    /// Load weights; fails if the snapshot's shapes differ from this model
    fn load_snapshot(&mut self, snapshot: &ModelSnapshot) -> Result<()>;

    fn n_classes(&self) -> usize {
        self.signal_mode().n_classes()
    }

    /// Predicted class for one feature vector
    fn decide(&self, features: ArrayView1<'_, f64>) -> usize {
        let logits = self.infer(&features.to_owned().insert_axis(Axis(0)));
        argmax(logits.row(0))
    }
}

/// Hidden ReLU layers with dropout followed by linear logits
pub struct FeedForwardClassifier {
    architecture: String,
    signal_mode: SignalMode,
    network: NeuralNetwork,
}

impl FeedForwardClassifier {
    pub fn new(
        architecture: &str,
        n_features: usize,
        hidden_sizes: &[usize],
        signal_mode: SignalMode,
        dropout: f64,
        seed: u64,
    ) -> Self {
        let config =
            NetworkConfig::new(n_features, hidden_sizes, signal_mode.n_classes()).with_dropout(dropout);
        Self {
            architecture: architecture.to_string(),
            signal_mode,
            network: NeuralNetwork::new(config, seed),
        }
    }
}

impl SignalClassifier for FeedForwardClassifier {
    fn class_name(&self) -> &str {
        &self.architecture
    }

    fn signal_mode(&self) -> SignalMode {
        self.signal_mode
    }

    fn n_features(&self) -> usize {
        self.network.config.input_size
    }

    fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        self.network.forward(input)
    }

    fn infer(&self, input: &Array2<f64>) -> Array2<f64> {
        self.network.infer(input)
    }

    fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<Vec<LayerGradient>> {
        self.network.backward(output_gradient)
    }

    fn parameters_mut(&mut self) -> Vec<LayerParams<'_>> {
        self.network.parameters_mut()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.network.set_mode(mode);
    }

    fn mode(&self) -> Mode {
        self.network.mode()
    }

    fn num_parameters(&self) -> usize {
        self.network.num_parameters()
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            architecture: self.architecture.clone(),
            signal_mode: self.signal_mode,
            network: self.network.config.clone(),
            layers: self.network.layers.clone(),
        }
    }

    fn load_snapshot(&mut self, snapshot: &ModelSnapshot) -> Result<()> {
        if snapshot.signal_mode != self.signal_mode {
            return Err(Error::ShapeMismatch(format!(
                "model outputs {} signals, snapshot has {}",
                self.signal_mode, snapshot.signal_mode
            )));
        }

        let weights = snapshot
            .layers
            .iter()
            .map(|l| (l.weights.clone(), l.biases.clone()))
            .collect();
        self.network.set_weights(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logits_cover_alphabet() {
        let model = FeedForwardClassifier::new("Pi_0", 4, &[5], SignalMode::Quinary, 0.1, 0);
        let logits = model.infer(&Array2::ones((2, 4)));
        assert_eq!(logits.dim(), (2, 5));
        assert_eq!(model.n_classes(), 5);
        assert!(model.decide(array![1.0, 0.0, 0.0, 1.0].view()) < 5);
    }

    #[test]
    fn test_snapshot_restores_predictions() {
        let a = FeedForwardClassifier::new("Pi_1", 3, &[6], SignalMode::Ternary, 0.2, 1);
        let mut b = FeedForwardClassifier::new("Pi_1", 3, &[6], SignalMode::Ternary, 0.2, 2);
        let x = array![[0.5, -0.2, 1.0]];
        assert_ne!(a.infer(&x), b.infer(&x));

        b.load_snapshot(&a.snapshot()).unwrap();
        assert_eq!(a.infer(&x), b.infer(&x));
    }

    #[test]
    fn test_snapshot_from_other_architecture_rejected() {
        let a = FeedForwardClassifier::new("Pi_0", 3, &[5], SignalMode::Ternary, 0.0, 1);
        let mut b = FeedForwardClassifier::new("Pi_1", 3, &[6], SignalMode::Ternary, 0.0, 1);
        assert!(matches!(
            b.load_snapshot(&a.snapshot()),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
