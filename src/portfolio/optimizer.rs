//! Monte Carlo Portfolio Optimizer
//!
//! Draws weight vectors uniformly from the probability simplex and keeps the
//! best candidate under four objectives at once. Trials are processed in
//! fixed-size chunks, each with its own seeded generator, so sequential and
//! parallel runs produce the same result.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::returns::{portfolio_performance, ReturnStatistics};

/// Trials per independently seeded chunk
pub const CHUNK_SIZE: usize = 10_000;

/// One simulated allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCandidate {
    pub weights: Array1<f64>,
    pub expected_return: f64,
    pub volatility: f64,
}

/// Risk and return limits of the constrained objectives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConstraints {
    pub volatility_ceiling: f64,
    pub return_floor: f64,
}

impl Default for PortfolioConstraints {
    fn default() -> Self {
        Self {
            volatility_ceiling: 0.85,
            return_floor: 3.0,
        }
    }
}

/// Selection policy of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    MaxReturn,
    MinVolatility,
    MaxReturnGivenRisk,
    MinVolatilityGivenReturn,
}

impl Objective {
    pub const ALL: [Objective; 4] = [
        Objective::MaxReturn,
        Objective::MinVolatility,
        Objective::MaxReturnGivenRisk,
        Objective::MinVolatilityGivenReturn,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Objective::MaxReturn => "Max Return",
            Objective::MinVolatility => "Min Risk",
            Objective::MaxReturnGivenRisk => "Max-Return Given-Risk",
            Objective::MinVolatilityGivenReturn => "Min-Risk Given-Return",
        }
    }

    /// Whether `candidate` strictly beats `current` under this policy
    pub fn improves(
        &self,
        candidate: &PortfolioCandidate,
        current: Option<&PortfolioCandidate>,
        constraints: &PortfolioConstraints,
    ) -> bool {
        let admissible = match self {
            Objective::MaxReturn | Objective::MinVolatility => true,
            Objective::MaxReturnGivenRisk => candidate.volatility <= constraints.volatility_ceiling,
            Objective::MinVolatilityGivenReturn => candidate.expected_return >= constraints.return_floor,
        };
        if !admissible {
            return false;
        }

        match (self, current) {
            (_, None) => true,
            (Objective::MaxReturn | Objective::MaxReturnGivenRisk, Some(best)) => {
                candidate.expected_return > best.expected_return
            }
            (Objective::MinVolatility | Objective::MinVolatilityGivenReturn, Some(best)) => {
                candidate.volatility < best.volatility
            }
        }
    }
}

/// Running best under one objective; never regresses
#[derive(Debug, Clone, PartialEq)]
pub struct BestTracker {
    pub objective: Objective,
    pub candidate: Option<PortfolioCandidate>,
}

impl BestTracker {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            candidate: None,
        }
    }

    /// Replace the current best if the candidate improves on it
    pub fn offer(&mut self, candidate: &PortfolioCandidate, constraints: &PortfolioConstraints) -> bool {
        if self
            .objective
            .improves(candidate, self.candidate.as_ref(), constraints)
        {
            self.candidate = Some(candidate.clone());
            true
        } else {
            false
        }
    }
}

/// The four trackers of one optimization run
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioOptimization {
    pub coins: Vec<String>,
    pub trackers: Vec<BestTracker>,
    pub n_simulations: usize,
}

impl PortfolioOptimization {
    fn empty(coins: Vec<String>) -> Self {
        Self {
            coins,
            trackers: Objective::ALL.iter().map(|&o| BestTracker::new(o)).collect(),
            n_simulations: 0,
        }
    }

    pub fn best(&self, objective: Objective) -> Option<&PortfolioCandidate> {
        self.trackers
            .iter()
            .find(|t| t.objective == objective)
            .and_then(|t| t.candidate.as_ref())
    }

    fn offer(&mut self, candidate: &PortfolioCandidate, constraints: &PortfolioConstraints) {
        for tracker in &mut self.trackers {
            tracker.offer(candidate, constraints);
        }
    }

    /// Fold in the results of a later chunk
    fn merge(&mut self, later: PortfolioOptimization, constraints: &PortfolioConstraints) {
        for tracker in later.trackers {
            if let Some(candidate) = tracker.candidate {
                if let Some(own) = self.trackers.iter_mut().find(|t| t.objective == tracker.objective) {
                    own.offer(&candidate, constraints);
                }
            }
        }
        self.n_simulations += later.n_simulations;
    }
}

impl fmt::Display for PortfolioOptimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tracker in &self.trackers {
            writeln!(f, "{}:", tracker.objective.title())?;
            match &tracker.candidate {
                Some(c) => {
                    writeln!(
                        f,
                        "  Return: {:.2}% | Volatility: {:.2}%",
                        c.expected_return * 100.0,
                        c.volatility * 100.0
                    )?;
                    let allocation: Vec<String> = self
                        .coins
                        .iter()
                        .zip(c.weights.iter())
                        .map(|(coin, w)| format!("{}: {:.2}%", coin, w * 100.0))
                        .collect();
                    writeln!(f, "  {}", allocation.join(" | "))?;
                }
                None => writeln!(f, "  no admissible portfolio")?,
            }
        }
        Ok(())
    }
}

/// Uniform draw from the probability simplex (normalized unit exponentials)
pub fn sample_simplex_weights<R: Rng>(n: usize, rng: &mut R) -> Array1<f64> {
    if n == 0 {
        return Array1::zeros(0);
    }
    loop {
        let draws: Array1<f64> = (0..n).map(|_| rng.sample::<f64, _>(Exp1)).collect();
        let total = draws.sum();
        if total > 0.0 && total.is_finite() {
            return draws / total;
        }
    }
}

/// Random-weight search over a fixed set of coins
pub struct MonteCarloOptimizer {
    stats: ReturnStatistics,
    interval: usize,
    constraints: PortfolioConstraints,
}

impl MonteCarloOptimizer {
    pub fn new(stats: ReturnStatistics, interval: usize, constraints: PortfolioConstraints) -> Self {
        Self {
            stats,
            interval,
            constraints,
        }
    }

    /// Evaluate one weight vector
    pub fn candidate(&self, weights: Array1<f64>) -> PortfolioCandidate {
        let (expected_return, volatility) = portfolio_performance(&weights, &self.stats, self.interval);
        PortfolioCandidate {
            weights,
            expected_return,
            volatility,
        }
    }

    pub fn run(&self, n_simulations: usize, seed: u64, parallel: bool) -> PortfolioOptimization {
        let n_chunks = (n_simulations + CHUNK_SIZE - 1) / CHUNK_SIZE;
        info!(
            "Simulating {} portfolios over {} coins ({} chunks)",
            n_simulations,
            self.stats.n_assets(),
            n_chunks
        );

        let run_chunk = |chunk: usize| {
            let start = chunk * CHUNK_SIZE;
            let trials = CHUNK_SIZE.min(n_simulations - start);
            self.run_chunk(trials, seed.wrapping_add(chunk as u64))
        };

        let chunks: Vec<PortfolioOptimization> = if parallel {
            (0..n_chunks).into_par_iter().map(run_chunk).collect()
        } else {
            (0..n_chunks).map(run_chunk).collect()
        };

        let mut result = PortfolioOptimization::empty(self.stats.coins.clone());
        for chunk in chunks {
            result.merge(chunk, &self.constraints);
        }

        for tracker in &result.trackers {
            if let Some(c) = &tracker.candidate {
                debug!(
                    "{}: return {:.4}, volatility {:.4}",
                    tracker.objective.title(),
                    c.expected_return,
                    c.volatility
                );
            }
        }
        result
    }

    fn run_chunk(&self, trials: usize, seed: u64) -> PortfolioOptimization {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut result = PortfolioOptimization::empty(self.stats.coins.clone());
        for _ in 0..trials {
            let weights = sample_simplex_weights(self.stats.n_assets(), &mut rng);
            let candidate = self.candidate(weights);
            result.offer(&candidate, &self.constraints);
        }
        result.n_simulations = trials;
        result
    }
}
