//! Neural Network Module
//!
//! Implements the feedforward signal classifiers from scratch:
//! - Dense layers with ReLU/linear activations and dropout
//! - Softmax cross-entropy loss
//! - Adam with multiplicative learning-rate decay

mod activation;
mod layer;
mod loss;
mod network;
mod optimizer;

pub use activation::{argmax, softmax, softmax_batch, Activation, ActivationType};
pub use layer::{DenseLayer, LayerGradient};
pub use loss::CrossEntropyLoss;
pub use network::{Mode, NetworkConfig, NeuralNetwork};
pub use optimizer::{Adam, LayerParams, MultiplicativeDecay, Optimizer};
