//! Command line entry point
//!
//! Subcommands:
//! - `search`: hyperparameter grid search for one architecture
//! - `prune`: drop persisted models that miss the partition thresholds
//! - `benchmark`: score one coin's models on another coin's data
//! - `promising`: list recorded trials above the accuracy bar
//! - `continue-training`: resume a persisted model
//! - `portfolio`: Monte Carlo allocation across coins
//! - `architectures`: list the known architecture identifiers
//! - `init-config`: write the default configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use nn_signal_crypto::{
    benchmark_models,
    model::HIDDEN_PREFIX,
    prune_models,
    portfolio::{load_histories, MonteCarloOptimizer, ReturnStatistics},
    search::continue_training,
    utils::{init_from_config, setup_logging, SplitPurpose},
    Config, GridSearch, HyperparameterPoint, ModelFactory, ModelKey, PerformanceStore,
};

#[derive(Parser)]
#[command(name = "nn_signal_crypto")]
#[command(version = "0.1.0")]
#[command(about = "Neural trading-signal models for cryptocurrencies", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level (overrides the configured level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid search over learning rate, decay and dropout
    Search {
        /// Coins whose datasets are used; several are merged into one
        #[arg(required = true)]
        coins: Vec<String>,

        /// Architecture identifier (e.g. Pi_3, Laptop_5, Hidden_40)
        #[arg(short, long)]
        architecture: Option<String>,

        /// Number of epochs per trial
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Run trials in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Evaluate and prune the persisted models of a coin
    Prune {
        coin: String,

        /// Maximum number of models to keep
        #[arg(short, long)]
        max_retained: Option<usize>,
    },

    /// Evaluate one coin's models against another coin's data
    Benchmark {
        /// Coin whose models are evaluated
        model_coin: String,

        /// Coin whose dataset is used
        data_coin: String,
    },

    /// List recorded trials above the accuracy bar
    Promising {
        coin: String,

        #[arg(short, long)]
        architecture: Option<String>,

        /// Exact accuracy must exceed this
        #[arg(long)]
        min_accuracy: Option<f64>,

        /// Catastrophic rate must stay below this
        #[arg(long)]
        max_inaccuracy: Option<f64>,
    },

    /// Continue training a persisted model with its recorded hyperparameters
    ContinueTraining {
        coin: String,

        architecture: String,

        trial: usize,

        #[arg(short, long)]
        epochs: Option<usize>,

        /// Override the recorded learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Override the recorded learning-rate decay
        #[arg(long)]
        decay: Option<f64>,

        /// Override the recorded dropout
        #[arg(long)]
        dropout: Option<f64>,
    },

    /// Monte Carlo search for portfolio weights
    Portfolio {
        /// Coins to allocate across (defaults to the configured list)
        coins: Vec<String>,

        #[arg(short = 'n', long)]
        simulations: Option<usize>,

        #[arg(long)]
        parallel: bool,
    },

    /// List the known architecture identifiers
    Architectures,

    /// Write the default configuration file
    InitConfig {
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    match cli.verbose {
        0 => init_from_config(&config.logging)?,
        1 => setup_logging("debug")?,
        _ => setup_logging("trace")?,
    }
    if cli.config.exists() {
        info!("Loaded configuration from {}", cli.config.display());
    } else {
        info!("{} not found, using defaults", cli.config.display());
    }

    match cli.command {
        Commands::Search {
            coins,
            architecture,
            epochs,
            parallel,
        } => run_search(config, &coins, architecture, epochs, parallel),

        Commands::Prune { coin, max_retained } => run_prune(config, &coin, max_retained),

        Commands::Benchmark {
            model_coin,
            data_coin,
        } => run_benchmark(&config, &model_coin, &data_coin),

        Commands::Promising {
            coin,
            architecture,
            min_accuracy,
            max_inaccuracy,
        } => list_promising(&config, &coin, architecture.as_deref(), min_accuracy, max_inaccuracy),

        Commands::ContinueTraining {
            coin,
            architecture,
            trial,
            epochs,
            learning_rate,
            decay,
            dropout,
        } => {
            let key = ModelKey::new(&coin, &architecture, trial);
            run_continue(config, &key, epochs, learning_rate, decay, dropout)
        }

        Commands::Portfolio {
            coins,
            simulations,
            parallel,
        } => run_portfolio(config, coins, simulations, parallel),

        Commands::Architectures => {
            let factory = ModelFactory::with_defaults();
            for id in factory.architectures() {
                println!("{}", id);
            }
            println!("{}<width> (one hidden layer of any width)", HIDDEN_PREFIX);
            Ok(())
        }

        Commands::InitConfig { output } => {
            Config::create_default(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Default configuration written to {}", output.display());
            Ok(())
        }
    }
}

fn run_search(
    mut config: Config,
    coins: &[String],
    architecture: Option<String>,
    epochs: Option<usize>,
    parallel: bool,
) -> Result<()> {
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }
    config.search.parallel |= parallel;
    let architecture = architecture.unwrap_or_else(|| config.model.architecture.clone());

    let (dataset, splits) = config
        .data
        .load_splits(coins, SplitPurpose::Training, config.training.seed)?;
    let factory = ModelFactory::with_defaults();
    let search = GridSearch::new(&factory, &dataset, &architecture, &config.search, &config.training);
    let summary = search.run(&splits)?;

    println!(
        "{} trials recorded in {}",
        summary.records.len(),
        search.store().path().display()
    );
    for failure in &summary.failures {
        println!("trial #{} failed: {}", failure.model_num, failure.error);
    }
    if let Some(best) = summary.best() {
        println!("\nBest trial:\n{}", best);
    }
    Ok(())
}

fn run_prune(mut config: Config, coin: &str, max_retained: Option<usize>) -> Result<()> {
    if let Some(max) = max_retained {
        config.pruning.max_retained = max;
    }
    let (_, splits) = config.data.load_splits(
        &[coin.to_string()],
        SplitPurpose::Evaluation,
        config.training.seed,
    )?;
    let factory = ModelFactory::with_defaults();
    let store = PerformanceStore::open(&config.search.reports_dir, coin);

    let report = prune_models(
        &factory,
        &config.search.models_dir,
        coin,
        &splits,
        store.exists().then_some(&store),
        &config.pruning,
    )?;

    for deletion in report.deletion_failures() {
        println!(
            "could not delete {}: {}",
            deletion.path.display(),
            deletion.error.as_deref().unwrap_or("unknown error")
        );
    }
    match report.best() {
        Some(best) => println!("Most reliable model: {}\n{}", best, best.accuracy),
        None => println!("{} had no models make the cut", coin),
    }
    Ok(())
}

fn run_benchmark(config: &Config, model_coin: &str, data_coin: &str) -> Result<()> {
    let (_, splits) = config.data.load_splits(
        &[data_coin.to_string()],
        SplitPurpose::Evaluation,
        config.training.seed,
    )?;
    let factory = ModelFactory::with_defaults();

    let report = benchmark_models(
        &factory,
        &config.search.models_dir,
        model_coin,
        &splits,
        &config.pruning.benchmark_thresholds,
        config.pruning.parallel,
    )?;

    println!(
        "{} of {} {} models qualify on {} data",
        report.qualified.len(),
        report.qualified.len() + report.rejected.len(),
        model_coin,
        data_coin
    );
    for score in &report.qualified {
        println!("{}\n{}", score, score.accuracy);
    }
    for (path, reason) in &report.skipped {
        println!("skipped {}: {}", path.display(), reason);
    }
    Ok(())
}

fn list_promising(
    config: &Config,
    coin: &str,
    architecture: Option<&str>,
    min_accuracy: Option<f64>,
    max_inaccuracy: Option<f64>,
) -> Result<()> {
    let store = PerformanceStore::open(&config.search.reports_dir, coin);
    let records = store
        .promising(
            min_accuracy.unwrap_or(config.pruning.promising_accuracy),
            max_inaccuracy.unwrap_or(config.pruning.max_inaccuracy),
            architecture,
        )
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    if records.is_empty() {
        println!("No promising records for {}", coin);
    }
    for record in &records {
        println!("{}\n", record);
    }
    Ok(())
}

fn run_continue(
    mut config: Config,
    key: &ModelKey,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    decay: Option<f64>,
    dropout: Option<f64>,
) -> Result<()> {
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }
    let store = PerformanceStore::open(&config.search.reports_dir, &key.coin);
    let recorded = if store.exists() {
        store.find(&key.architecture, key.trial)?
    } else {
        None
    };

    let hyperparameters = match (recorded, learning_rate, decay, dropout) {
        (Some(record), lr, d, p) => HyperparameterPoint {
            learning_rate: lr.unwrap_or(record.hyperparameters.learning_rate),
            learning_rate_decay: d.unwrap_or(record.hyperparameters.learning_rate_decay),
            dropout: p.unwrap_or(record.hyperparameters.dropout),
        },
        (None, Some(learning_rate), Some(learning_rate_decay), Some(dropout)) => {
            HyperparameterPoint {
                learning_rate,
                learning_rate_decay,
                dropout,
            }
        }
        (None, ..) => bail!(
            "no record for {} in {}; pass --learning-rate, --decay and --dropout",
            key,
            store.path().display()
        ),
    };

    let (_, splits) = config.data.load_splits(
        &[key.coin.clone()],
        SplitPurpose::Training,
        config.training.seed,
    )?;
    let factory = ModelFactory::with_defaults();
    let record = continue_training(
        &factory,
        &config.search.models_dir,
        &store,
        key,
        hyperparameters,
        &splits,
        &config.training,
    )
    .with_context(|| format!("Failed to continue {}", key))?;

    println!("{}", record);
    Ok(())
}

fn run_portfolio(
    mut config: Config,
    coins: Vec<String>,
    simulations: Option<usize>,
    parallel: bool,
) -> Result<()> {
    if !coins.is_empty() {
        config.portfolio.coins = coins;
    }
    if let Some(n) = simulations {
        config.portfolio.n_simulations = n;
    }
    let portfolio = &config.portfolio;

    let histories = load_histories(&config.data.raw_dir, &portfolio.coins)
        .with_context(|| format!("Failed to load prices from {}", config.data.raw_dir.display()))?;
    let stats = ReturnStatistics::from_histories(&histories, portfolio.interval)?;
    let optimizer = MonteCarloOptimizer::new(stats, portfolio.interval, portfolio.constraints);

    let result = optimizer.run(
        portfolio.n_simulations,
        portfolio.seed,
        portfolio.parallel || parallel,
    );
    println!("{}", result);
    Ok(())
}
