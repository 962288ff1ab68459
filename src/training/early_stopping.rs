//! Early Stopping
//!
//! Checkpoint-level training losses are kept in a history that starts with
//! `+inf`. After each checkpoint the current loss is compared against earlier
//! entries over three windows of increasing length with increasingly lax
//! thresholds; any rule firing ends the run.
//!
//! The default short-window rule compares against the lowest loss of its
//! window, not the single entry five checkpoints back, so a loss that rises
//! after a dip stops the run even when it is still below the older entry.
//! This ends noisy runs earlier than a plain lookback. Setting
//! `baseline = "lookback"` on that rule restores the plain comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the current loss is compared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// Lowest loss among the last `window` entries
    WindowMin,
    /// The single entry `window` checkpoints back
    Lookback,
}

/// Stop when `current - baseline > threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopRule {
    pub window: usize,
    pub threshold: f64,
    pub baseline: Baseline,
}

impl StopRule {
    /// Loss delta against the baseline, if the history is long enough
    pub fn delta(&self, history: &[f64], current_index: usize, current_loss: f64) -> Option<f64> {
        if self.window == 0 || current_index < self.window {
            return None;
        }

        let start = current_index - self.window;
        let baseline = match self.baseline {
            Baseline::Lookback => *history.get(start)?,
            Baseline::WindowMin => {
                let end = current_index.min(history.len());
                history
                    .get(start..end)?
                    .iter()
                    .copied()
                    .fold(f64::INFINITY, f64::min)
            }
        };
        Some(current_loss - baseline)
    }
}

/// Which rule fired and by how much
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopTrigger {
    pub rule: usize,
    pub window: usize,
    pub delta: f64,
}

impl fmt::Display for StopTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {} ({}-checkpoint window, delta {:+.6})",
            self.rule, self.window, self.delta
        )
    }
}

/// Ordered set of stop rules; the first match wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingPolicy {
    pub rules: Vec<StopRule>,
}

impl Default for EarlyStoppingPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                StopRule {
                    window: 5,
                    threshold: 0.001,
                    baseline: Baseline::WindowMin,
                },
                StopRule {
                    window: 10,
                    threshold: 0.0,
                    baseline: Baseline::Lookback,
                },
                StopRule {
                    window: 15,
                    threshold: -0.1,
                    baseline: Baseline::Lookback,
                },
            ],
        }
    }
}

impl EarlyStoppingPolicy {
    /// Policy that never stops
    pub fn disabled() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn check(&self, history: &[f64], current_index: usize, current_loss: f64) -> Option<StopTrigger> {
        self.rules.iter().enumerate().find_map(|(i, rule)| {
            rule.delta(history, current_index, current_loss)
                .filter(|&delta| delta > rule.threshold)
                .map(|delta| StopTrigger {
                    rule: i,
                    window: rule.window,
                    delta,
                })
        })
    }
}

/// Default policy as a plain predicate
pub fn should_stop(history: &[f64], current_index: usize, current_loss: f64) -> bool {
    EarlyStoppingPolicy::default()
        .check(history, current_index, current_loss)
        .is_some()
}

/// Stateful tracker consulted after every validation checkpoint
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    policy: EarlyStoppingPolicy,
    history: Vec<f64>,
}

impl EarlyStopping {
    pub fn new(policy: EarlyStoppingPolicy) -> Self {
        Self {
            policy,
            history: vec![f64::INFINITY],
        }
    }

    /// Append a checkpoint loss and evaluate the rules at its index
    pub fn record(&mut self, loss: f64) -> Option<StopTrigger> {
        self.history.push(loss);
        let index = self.history.len() - 1;
        self.policy.check(&self.history, index, loss)
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_a_fires_on_uptick() {
        let history = [1.0, 0.9, 0.8, 0.7, 0.6, 0.65];
        assert!(should_stop(&history, 5, 0.65));
    }

    #[test]
    fn test_steady_decrease_does_not_stop() {
        let history: Vec<f64> = (0..20).map(|i| 10.0 - i as f64).collect();
        for idx in 0..20 {
            assert!(!should_stop(&history, idx, history[idx]), "stopped at {}", idx);
        }
    }

    #[test]
    fn test_too_short_history_never_stops() {
        assert!(!should_stop(&[0.1, 5.0], 1, 5.0));
        assert!(!should_stop(&[0.1, 0.2, 0.3, 0.4, 5.0], 4, 5.0));
    }

    #[test]
    fn test_window_min_stops_earlier_than_lookback() {
        let history = [2.0, 1.0, 0.5, 0.6, 0.7, 0.8];
        let window_min = EarlyStoppingPolicy::default();
        let mut lookback = window_min.clone();
        lookback.rules[0].baseline = Baseline::Lookback;

        let trigger = window_min.check(&history, 5, 0.8).unwrap();
        assert_eq!(trigger.rule, 0);
        assert!((trigger.delta - 0.3).abs() < 1e-9);
        assert!(lookback.check(&history, 5, 0.8).is_none());
    }

    #[test]
    fn test_rule_b_lookback() {
        let policy = EarlyStoppingPolicy {
            rules: vec![EarlyStoppingPolicy::default().rules[1]],
        };
        let mut history = vec![1.0; 11];
        assert!(policy.check(&history, 10, 1.0).is_none());
        history[10] = 1.01;
        assert_eq!(policy.check(&history, 10, 1.01).map(|t| t.window), Some(10));
    }

    #[test]
    fn test_rule_c_needs_large_improvement() {
        let policy = EarlyStoppingPolicy {
            rules: vec![EarlyStoppingPolicy::default().rules[2]],
        };
        let mut history = vec![2.0; 16];
        // improved by 0.05 over 15 checkpoints: not enough
        history[15] = 1.95;
        assert!(policy.check(&history, 15, 1.95).is_some());
        history[15] = 1.5;
        assert!(policy.check(&history, 15, 1.5).is_none());
    }

    #[test]
    fn test_stateful_tracker() {
        let mut stopper = EarlyStopping::new(EarlyStoppingPolicy::default());
        for loss in [1.0, 0.9, 0.8, 0.7, 0.6] {
            assert!(stopper.record(loss).is_none());
        }
        let trigger = stopper.record(0.65).unwrap();
        assert_eq!(trigger.rule, 0);
        assert!((trigger.delta - 0.05).abs() < 1e-9);
        assert_eq!(stopper.history().len(), 7);
    }

    #[test]
    fn test_disabled_policy() {
        let mut stopper = EarlyStopping::new(EarlyStoppingPolicy::disabled());
        for _ in 0..30 {
            assert!(stopper.record(1.0).is_none());
        }
    }
}
