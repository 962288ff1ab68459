//! Dense (Fully Connected) Layer Implementation
//!
//! A dense layer performs: output = dropout(activation(input * weights + bias))

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::activation::{create_activation, ActivationType};

/// Weight and bias gradients of one layer
#[derive(Debug, Clone)]
pub struct LayerGradient {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

/// Dense layer with weights, biases, and activation function
#[derive(Debug, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix (input_size x output_size)
    pub weights: Array2<f64>,
    /// Bias vector (output_size)
    pub biases: Array1<f64>,
    /// Activation function type
    pub activation_type: ActivationType,
    /// Dropout rate (0.0 = no dropout)
    pub dropout_rate: f64,

    #[serde(skip)]
    last_input: Option<Array2<f64>>,
    #[serde(skip)]
    last_z: Option<Array2<f64>>,
    #[serde(skip)]
    dropout_mask: Option<Array2<f64>>,
}

impl DenseLayer {
    /// Create a new dense layer with Xavier initialization
    pub fn new<R: Rng>(
        input_size: usize,
        output_size: usize,
        activation: ActivationType,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        let weights = Array2::random_using((input_size, output_size), Uniform::new(-limit, limit), rng);
        let biases = Array1::zeros(output_size);

        Self {
            weights,
            biases,
            activation_type: activation,
            dropout_rate: 0.0,
            last_input: None,
            last_z: None,
            dropout_mask: None,
        }
    }

    /// Create layer with specific dropout rate
    pub fn with_dropout(mut self, rate: f64) -> Self {
        self.dropout_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass that caches what backpropagation needs
    pub fn forward<R: Rng>(&mut self, input: &Array2<f64>, training: bool, rng: &mut R) -> Array2<f64> {
        let z = self.linear(input);
        let mut output = create_activation(self.activation_type).forward_batch(&z);

        self.dropout_mask = None;
        if training && self.dropout_rate > 0.0 {
            let keep = 1.0 - self.dropout_rate;
            let mask = Array2::from_shape_fn(output.dim(), |_| {
                if keep > 0.0 && rng.gen::<f64>() < keep {
                    1.0 / keep
                } else {
                    0.0
                }
            });
            output = &output * &mask;
            self.dropout_mask = Some(mask);
        }

        self.last_input = Some(input.clone());
        self.last_z = Some(z);
        output
    }

    /// Inference pass: no dropout, no caching
    pub fn infer(&self, input: &Array2<f64>) -> Array2<f64> {
        create_activation(self.activation_type).forward_batch(&self.linear(input))
    }

    fn linear(&self, input: &Array2<f64>) -> Array2<f64> {
        let mut z = input.dot(&self.weights);
        for mut row in z.rows_mut() {
            row += &self.biases;
        }
        z
    }

    /// Backward pass.
    /// Returns the gradient for the previous layer, or `None` when
    /// `forward` has not been called since the last backward pass.
    pub fn backward(&mut self, output_gradient: &Array2<f64>) -> Option<(Array2<f64>, LayerGradient)> {
        let z = self.last_z.take()?;
        let input = self.last_input.take()?;

        let grad = match self.dropout_mask.take() {
            Some(mask) => output_gradient * &mask,
            None => output_gradient.clone(),
        };

        let activation_grad = create_activation(self.activation_type).backward_batch(&z);
        let delta = &grad * &activation_grad;

        let gradient = LayerGradient {
            weights: input.t().dot(&delta),
            biases: delta.sum_axis(Axis(0)),
        };
        let input_gradient = delta.dot(&self.weights.t());

        Some((input_gradient, gradient))
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.biases.len()
    }
}

impl Clone for DenseLayer {
    fn clone(&self) -> Self {
        Self {
            weights: self.weights.clone(),
            biases: self.biases.clone(),
            activation_type: self.activation_type,
            dropout_rate: self.dropout_rate,
            last_input: None,
            last_z: None,
            dropout_mask: None,
        }
    }
}
