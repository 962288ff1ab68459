//! Utility module
//!
//! This module provides:
//! - Configuration management
//! - Logging setup

mod config;
mod logging;

pub use config::{
    Config, DataConfig, LoggingConfig, ModelConfig, PortfolioConfig, PruningConfig, SearchConfig,
    SplitPurpose, TrainingConfig, COMBINED_DATASET,
};
pub use logging::{init_from_config, setup_logging, setup_logging_with_file};
