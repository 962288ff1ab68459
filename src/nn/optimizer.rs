//! Optimization Algorithms
//!
//! Adam (Adaptive Moment Estimation) over all layers of a network, plus the
//! multiplicative learning-rate decay applied after every update.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::layer::LayerGradient;

/// Mutable view of one layer's trainable parameters
pub struct LayerParams<'a> {
    pub weights: &'a mut Array2<f64>,
    pub biases: &'a mut Array1<f64>,
}

/// Optimizer trait for parameter updates
pub trait Optimizer: Send {
    /// Apply one update; `params` and `grads` are in layer order
    fn step(&mut self, params: Vec<LayerParams<'_>>, grads: &[LayerGradient]);

    /// Current learning rate
    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, learning_rate: f64);
}

#[derive(Debug, Clone)]
struct Moments {
    m_w: Array2<f64>,
    v_w: Array2<f64>,
    m_b: Array1<f64>,
    v_b: Array1<f64>,
}

impl Moments {
    fn zeros(weights: &Array2<f64>, biases: &Array1<f64>) -> Self {
        Self {
            m_w: Array2::zeros(weights.dim()),
            v_w: Array2::zeros(weights.dim()),
            m_b: Array1::zeros(biases.len()),
            v_b: Array1::zeros(biases.len()),
        }
    }
}

/// Adam optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    #[serde(skip)]
    t: i32,
    #[serde(skip)]
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments: Vec::new(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: Vec<LayerParams<'_>>, grads: &[LayerGradient]) {
        if self.moments.len() != params.len() {
            self.moments = params
                .iter()
                .map(|p| Moments::zeros(p.weights, p.biases))
                .collect();
        }

        self.t += 1;
        let correction1 = 1.0 - self.beta1.powi(self.t);
        let correction2 = 1.0 - self.beta2.powi(self.t);
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);

        for ((param, grad), state) in params.into_iter().zip(grads).zip(&mut self.moments) {
            state.m_w = &state.m_w * b1 + &grad.weights * (1.0 - b1);
            state.v_w = &state.v_w * b2 + &(&grad.weights * &grad.weights) * (1.0 - b2);
            let m_hat = &state.m_w / correction1;
            let v_hat = &state.v_w / correction2;
            *param.weights -= &(m_hat * lr / (v_hat.mapv(f64::sqrt) + eps));

            state.m_b = &state.m_b * b1 + &grad.biases * (1.0 - b1);
            state.v_b = &state.v_b * b2 + &(&grad.biases * &grad.biases) * (1.0 - b2);
            let m_hat = &state.m_b / correction1;
            let v_hat = &state.v_b / correction2;
            *param.biases -= &(m_hat * lr / (v_hat.mapv(f64::sqrt) + eps));
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }
}

/// Multiplies the optimizer's learning rate by `decay` on every step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MultiplicativeDecay {
    pub decay: f64,
}

impl MultiplicativeDecay {
    pub fn new(decay: f64) -> Self {
        Self { decay }
    }

    pub fn step(&self, optimizer: &mut dyn Optimizer) {
        let lr = optimizer.learning_rate();
        optimizer.set_learning_rate(lr * self.decay);
    }
}
