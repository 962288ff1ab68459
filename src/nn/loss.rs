//! Softmax cross-entropy on raw logits

use ndarray::{Array2, ArrayView1};

use super::activation::softmax;

/// Categorical cross-entropy over logits with an integer target class
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// `-log softmax(logits)[target]`, computed via log-sum-exp
    pub fn loss(&self, logits: ArrayView1<'_, f64>, target: usize) -> f64 {
        let max = logits.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum = logits.iter().map(|&v| (v - max).exp()).sum::<f64>().ln() + max;
        log_sum - logits[target]
    }

    /// Gradient with respect to a 1 x C logits batch: `softmax - onehot`
    pub fn gradient(&self, logits: &Array2<f64>, target: usize) -> Array2<f64> {
        let mut grad = logits.clone();
        for mut row in grad.rows_mut() {
            let p = softmax(row.view());
            row.assign(&p);
            row[target] -= 1.0;
        }
        grad
    }
}
