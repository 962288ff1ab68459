//! Neural Network Implementation
//!
//! Feedforward classifier: ReLU hidden layers (each followed by dropout)
//! and a linear output layer producing one logit per signal class.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::activation::ActivationType;
use super::layer::{DenseLayer, LayerGradient};
use super::optimizer::LayerParams;
use crate::error::{Error, Result};

/// Whether dropout is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Train,
    Eval,
}

/// Neural Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_size: usize,
    pub dropout: f64,
}

impl NetworkConfig {
    pub fn new(input_size: usize, hidden_sizes: &[usize], output_size: usize) -> Self {
        Self {
            input_size,
            hidden_sizes: hidden_sizes.to_vec(),
            output_size,
            dropout: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// `(input, output)` shape of every layer, in order
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        let mut sizes = vec![self.input_size];
        sizes.extend(&self.hidden_sizes);
        sizes.push(self.output_size);
        sizes.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

/// Feedforward Neural Network
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
    pub config: NetworkConfig,
    mode: Mode,
    rng: StdRng,
}

impl NeuralNetwork {
    /// Create network from configuration; `seed` drives both
    /// initialization and dropout masks
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let shapes = config.layer_shapes();
        let last = shapes.len() - 1;

        let layers = shapes
            .iter()
            .enumerate()
            .map(|(i, &(input, output))| {
                if i == last {
                    DenseLayer::new(input, output, ActivationType::Linear, &mut rng)
                } else {
                    DenseLayer::new(input, output, ActivationType::ReLU, &mut rng)
                        .with_dropout(config.dropout)
                }
            })
            .collect();

        Self {
            layers,
            config,
            mode: Mode::Train,
            rng,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Forward pass honoring the current mode, caching for backward
    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        let training = self.mode == Mode::Train;
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output, training, &mut self.rng);
        }
        output
    }

    /// Deterministic forward pass (no dropout, no caching)
    pub fn infer(&self, input: &Array2<f64>) -> Array2<f64> {
        self.layers
            .iter()
            .fold(input.clone(), |output, layer| layer.infer(&output))
    }

    /// Backpropagate a logits gradient; returns gradients in layer order
    pub fn backward(&mut self, output_gradient: &Array2<f64>) -> Result<Vec<LayerGradient>> {
        let mut gradient = output_gradient.clone();
        let mut grads = Vec::with_capacity(self.layers.len());

        for layer in self.layers.iter_mut().rev() {
            let (input_grad, layer_grad) = layer.backward(&gradient).ok_or_else(|| {
                Error::ShapeMismatch("backward called without a preceding forward pass".to_string())
            })?;
            grads.push(layer_grad);
            gradient = input_grad;
        }

        grads.reverse();
        Ok(grads)
    }

    /// Mutable parameter views for the optimizer
    pub fn parameters_mut(&mut self) -> Vec<LayerParams<'_>> {
        self.layers
            .iter_mut()
            .map(|layer| LayerParams {
                weights: &mut layer.weights,
                biases: &mut layer.biases,
            })
            .collect()
    }

    /// Copy of every layer's weights and biases
    pub fn weights(&self) -> Vec<(Array2<f64>, Array1<f64>)> {
        self.layers
            .iter()
            .map(|l| (l.weights.clone(), l.biases.clone()))
            .collect()
    }

    /// Replace all weights; shapes must match the configured architecture
    pub fn set_weights(&mut self, weights: Vec<(Array2<f64>, Array1<f64>)>) -> Result<()> {
        if weights.len() != self.layers.len() {
            return Err(Error::ShapeMismatch(format!(
                "expected {} layers, got {}",
                self.layers.len(),
                weights.len()
            )));
        }

        for (i, (layer, (w, b))) in self.layers.iter().zip(&weights).enumerate() {
            if layer.weights.dim() != w.dim() || layer.biases.len() != b.len() {
                return Err(Error::ShapeMismatch(format!(
                    "layer {}: expected {:?}, got {:?}",
                    i,
                    layer.weights.dim(),
                    w.dim()
                )));
            }
        }

        for (layer, (w, b)) in self.layers.iter_mut().zip(weights) {
            layer.weights = w;
            layer.biases = b;
        }
        Ok(())
    }

    /// Get total number of parameters
    pub fn num_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.num_parameters()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Adam, CrossEntropyLoss, Optimizer};
    use ndarray::array;

    #[test]
    fn test_network_creation() {
        let network = NeuralNetwork::new(NetworkConfig::new(25, &[20, 13], 3), 0);
        assert_eq!(network.layers.len(), 3);
        assert_eq!(network.num_parameters(), 25 * 20 + 20 + 20 * 13 + 13 + 13 * 3 + 3);
        assert_eq!(network.layers[2].activation_type, ActivationType::Linear);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let a = NeuralNetwork::new(NetworkConfig::new(4, &[5], 3), 9);
        let b = NeuralNetwork::new(NetworkConfig::new(4, &[5], 3), 9);
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_eval_forward_is_deterministic() {
        let mut network = NeuralNetwork::new(NetworkConfig::new(4, &[8], 3).with_dropout(0.5), 1);
        network.set_mode(Mode::Eval);
        let input = Array2::ones((1, 4));
        assert_eq!(network.forward(&input), network.forward(&input));
        assert_eq!(network.forward(&input), network.infer(&input));
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut network = NeuralNetwork::new(NetworkConfig::new(2, &[8], 3), 3);
        let mut optimizer = Adam::new(0.01);
        let criterion = CrossEntropyLoss;
        let samples = [(array![[1.0, 0.0]], 0), (array![[0.0, 1.0]], 2)];

        let total = |net: &NeuralNetwork| -> f64 {
            samples
                .iter()
                .map(|(x, y)| criterion.loss(net.infer(x).row(0), *y))
                .sum()
        };

        let initial = total(&network);
        for _ in 0..200 {
            for (x, y) in &samples {
                let logits = network.forward(x);
                let grads = network.backward(&criterion.gradient(&logits, *y)).unwrap();
                optimizer.step(network.parameters_mut(), &grads);
            }
        }
        assert!(total(&network) < initial);
    }

    #[test]
    fn test_set_weights_rejects_wrong_shape() {
        let mut network = NeuralNetwork::new(NetworkConfig::new(4, &[5], 3), 0);
        let mut other = NeuralNetwork::new(NetworkConfig::new(4, &[6], 3), 0);
        assert!(network.set_weights(other.weights()).is_err());
        let own = other.weights();
        assert!(other.set_weights(own).is_ok());
    }
}
