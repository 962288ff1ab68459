//! Signal Alphabet
//!
//! Class labels are ordered from "strong sell" (index 0) through "hold"
//! (the middle index) to "strong buy" (the last index). The severity
//! taxonomy depends on this ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    /// sell / hold / buy
    #[default]
    Ternary,
    /// strong sell / sell / hold / buy / strong buy
    Quinary,
    /// three magnitudes on each side of hold
    Septenary,
}

/// Which side of "hold" a class lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sell,
    Hold,
    Buy,
}

impl SignalMode {
    /// Number of classes in the alphabet
    pub fn n_classes(&self) -> usize {
        match self {
            SignalMode::Ternary => 3,
            SignalMode::Quinary => 5,
            SignalMode::Septenary => 7,
        }
    }

    /// Look up the mode for a class count
    pub fn from_n_classes(n_classes: usize) -> Option<Self> {
        match n_classes {
            3 => Some(SignalMode::Ternary),
            5 => Some(SignalMode::Quinary),
            7 => Some(SignalMode::Septenary),
            _ => None,
        }
    }

    /// Index of the "hold" class
    pub fn hold(&self) -> usize {
        (self.n_classes() - 1) / 2
    }

    /// Granular modes distinguish magnitude within buy/sell
    pub fn is_granular(&self) -> bool {
        self.n_classes() > 3
    }

    /// Check that a class index belongs to the alphabet
    pub fn contains(&self, class: usize) -> bool {
        class < self.n_classes()
    }

    /// Side of hold for a class index
    pub fn side(&self, class: usize) -> Side {
        let hold = self.hold();
        if class < hold {
            Side::Sell
        } else if class > hold {
            Side::Buy
        } else {
            Side::Hold
        }
    }

    /// Class index mirrored around hold
    pub fn mirror(&self, class: usize) -> usize {
        self.n_classes() - 1 - class
    }

    /// Human-readable label name
    pub fn label_name(&self, class: usize) -> String {
        let hold = self.hold();
        match self.side(class) {
            Side::Hold => "hold".to_string(),
            Side::Sell => magnitude_name("sell", hold - class, hold),
            Side::Buy => magnitude_name("buy", class - hold, hold),
        }
    }
}

fn magnitude_name(action: &str, distance: usize, max_distance: usize) -> String {
    match (distance, max_distance) {
        (1, 1) => action.to_string(),
        (d, m) if d == m => format!("strong {}", action),
        (1, _) => format!("weak {}", action),
        _ => action.to_string(),
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-class", self.n_classes())
    }
}
