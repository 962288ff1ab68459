//! Portfolio Module
//!
//! Monte Carlo search for weight allocations across a basket of coins:
//! - Price histories, simple returns, sample covariance
//! - Four simultaneous best-of trackers (max return, min risk and their
//!   constrained variants)

mod optimizer;
mod returns;

pub use optimizer::{
    sample_simplex_weights, BestTracker, MonteCarloOptimizer, Objective, PortfolioCandidate,
    PortfolioConstraints, PortfolioOptimization, CHUNK_SIZE,
};
pub use returns::{
    load_histories, portfolio_performance, simple_returns, PriceHistory, ReturnStatistics,
};
