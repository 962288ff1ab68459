//! Activation Functions
//!
//! Hidden layers use ReLU; the output layer is linear and produces logits.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Types of activation functions available
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationType {
    /// Rectified Linear Unit: max(0, x)
    ReLU,
    /// Linear (identity): x
    Linear,
}

/// Activation function with its derivative
pub trait Activation: Send + Sync {
    /// Apply to a batch (rows = samples)
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64>;

    /// Derivative with respect to the pre-activation, evaluated at `x`
    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64>;
}

/// ReLU activation function
pub struct ReLU;

impl Activation for ReLU {
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| v.max(0.0))
    }

    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }
}

/// Linear (identity) activation function
pub struct Linear;

impl Activation for Linear {
    fn forward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        x.clone()
    }

    fn backward_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        Array2::ones(x.dim())
    }
}

/// Create an activation function from type
pub fn create_activation(activation_type: ActivationType) -> Box<dyn Activation> {
    match activation_type {
        ActivationType::ReLU => Box::new(ReLU),
        ActivationType::Linear => Box::new(Linear),
    }
}

/// Numerically stable softmax of one row of logits
pub fn softmax(logits: ArrayView1<'_, f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Row-wise softmax
pub fn softmax_batch(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for (mut row, src) in out.axis_iter_mut(Axis(0)).zip(logits.axis_iter(Axis(0))) {
        row.assign(&softmax(src));
    }
    out
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_relu() {
        let x = array![[-1.0, 0.0, 1.0, 2.0]];
        assert_eq!(ReLU.forward_batch(&x), array![[0.0, 0.0, 1.0, 2.0]]);
        assert_eq!(ReLU.backward_batch(&x), array![[0.0, 0.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(array![1.0, 2.0, 3.0].view());
        assert_relative_eq!(p.sum(), 1.0, epsilon = 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let p = softmax(array![1000.0, 1000.0].view());
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(array![0.2, 0.7, 0.7].view()), 1);
        assert_eq!(argmax(array![3.0, -1.0].view()), 0);
    }
}
