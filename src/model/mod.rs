//! Model Module
//!
//! - `SignalClassifier`: the capability set every architecture exposes
//! - `ModelFactory`: registry from architecture identifier to constructor
//! - Weight snapshots keyed by (coin, architecture, trial)

mod classifier;
mod persistence;
mod registry;

pub use classifier::{FeedForwardClassifier, ModelSnapshot, SignalClassifier};
pub use persistence::{list_models, load_model, read_snapshot, save_model, ModelKey};
pub use registry::{builtin_architectures, ModelConstructor, ModelFactory, ModelSpec, HIDDEN_PREFIX};
