//! Training Engine
//!
//! One datapoint per optimizer step. The learning rate decays after every
//! step, and validation runs every `batch_interval` steps and at the last
//! step of each epoch.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info};

use super::context::TrainingContext;
use super::early_stopping::{EarlyStopping, StopTrigger};
use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::model::SignalClassifier;
use crate::nn::{CrossEntropyLoss, Mode};
use crate::utils::TrainingConfig;

/// Losses recorded at one validation checkpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub epoch: usize,
    pub step: usize,
    pub steps_in_epoch: usize,
    pub elapsed_secs: f64,
    /// Running mean training loss of the current epoch
    pub train_loss: f64,
    pub valid_loss: f64,
    pub min_valid_loss: f64,
    pub learning_rate: f64,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {} step {}/{} | {:.1}s | train loss {:.6} | valid loss {:.6} (min {:.6}) | lr {:.6e}",
            self.epoch + 1,
            self.step,
            self.steps_in_epoch,
            self.elapsed_secs,
            self.train_loss,
            self.valid_loss,
            self.min_valid_loss,
            self.learning_rate
        )
    }
}

/// Diagnostics of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTrace {
    pub checkpoints: Vec<Checkpoint>,
    pub min_valid_loss: f64,
    pub epochs_completed: usize,
    pub stopped: Option<StopTrigger>,
}

impl TrainingTrace {
    pub fn new() -> Self {
        Self {
            checkpoints: Vec::new(),
            min_valid_loss: f64::INFINITY,
            epochs_completed: 0,
            stopped: None,
        }
    }

    /// Mean training loss at the last checkpoint
    pub fn final_train_loss(&self) -> f64 {
        self.checkpoints
            .last()
            .map(|c| c.train_loss)
            .unwrap_or(f64::NAN)
    }

    pub fn stopped_early(&self) -> bool {
        self.stopped.is_some()
    }
}

impl Default for TrainingTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean loss over a dataset with dropout disabled.
/// Leaves the model in eval mode.
pub fn validate(
    model: &mut dyn SignalClassifier,
    criterion: &CrossEntropyLoss,
    data: &Dataset,
) -> Result<f64> {
    if data.is_empty() {
        return Err(Error::InsufficientData(
            "validation set is empty".to_string(),
        ));
    }

    model.set_mode(Mode::Eval);
    let total: f64 = data
        .iter()
        .map(|point| {
            let logits = model.infer(&point.as_batch());
            criterion.loss(logits.row(0), point.label)
        })
        .sum();

    Ok(total / data.len() as f64)
}

/// Run a single epoch without early stopping
pub fn train_epoch(
    ctx: &mut TrainingContext,
    train_data: &Dataset,
    valid_data: &Dataset,
    batch_interval: usize,
) -> Result<TrainingTrace> {
    let mut trace = TrainingTrace::new();
    let started = Instant::now();
    run_epoch(ctx, train_data, valid_data, batch_interval, 0, None, &mut trace, started)?;
    trace.epochs_completed = 1;
    Ok(trace)
}

/// Multi-epoch training with early stopping consulted at every checkpoint.
/// A stop ends the whole run; it is reported in the trace, not as an error.
pub fn train(
    ctx: &mut TrainingContext,
    train_data: &Dataset,
    valid_data: &Dataset,
    config: &TrainingConfig,
) -> Result<TrainingTrace> {
    let mut trace = TrainingTrace::new();
    let mut stopper = EarlyStopping::new(config.early_stopping.clone());
    let started = Instant::now();

    for epoch in 0..config.epochs {
        let stop = run_epoch(
            ctx,
            train_data,
            valid_data,
            config.batch_interval,
            epoch,
            Some(&mut stopper),
            &mut trace,
            started,
        )?;
        trace.epochs_completed = epoch + 1;

        if let Some(trigger) = stop {
            info!("Early stop in epoch {}: {}", epoch + 1, trigger);
            trace.stopped = Some(trigger);
            break;
        }
    }

    Ok(trace)
}

#[allow(clippy::too_many_arguments)]
fn run_epoch(
    ctx: &mut TrainingContext,
    train_data: &Dataset,
    valid_data: &Dataset,
    batch_interval: usize,
    epoch: usize,
    mut stopper: Option<&mut EarlyStopping>,
    trace: &mut TrainingTrace,
    started: Instant,
) -> Result<Option<StopTrigger>> {
    if train_data.is_empty() {
        return Err(Error::InsufficientData("training set is empty".to_string()));
    }
    if valid_data.is_empty() {
        return Err(Error::InsufficientData("validation set is empty".to_string()));
    }
    let n_features = ctx.model.n_features();
    if let Some(point) = train_data
        .iter()
        .chain(valid_data.iter())
        .find(|p| p.features.len() != n_features)
    {
        return Err(Error::ShapeMismatch(format!(
            "model expects {} features, datapoint has {}",
            n_features,
            point.features.len()
        )));
    }
    let interval = batch_interval.max(1);

    let order = train_data.shuffled_indices(&mut ctx.rng);
    let steps_in_epoch = order.len();
    let mut cumulative_loss = 0.0;

    for (i, &idx) in order.iter().enumerate() {
        let point = &train_data.points()[idx];
        let step = i + 1;

        ctx.model.set_mode(Mode::Train);
        let logits = ctx.model.forward(&point.as_batch());
        let loss = ctx.criterion.loss(logits.row(0), point.label);
        if !loss.is_finite() {
            return Err(Error::Diverged(format!(
                "loss {} at epoch {} step {}",
                loss,
                epoch + 1,
                step
            )));
        }

        let grad = ctx.criterion.gradient(&logits, point.label);
        let grads = ctx.model.backward(&grad)?;
        ctx.optimizer.step(ctx.model.parameters_mut(), &grads);
        ctx.scheduler.step(ctx.optimizer.as_mut());

        cumulative_loss += loss;

        if step % interval == 0 || step == steps_in_epoch {
            let valid_loss = validate(ctx.model.as_mut(), &ctx.criterion, valid_data)?;
            if valid_loss < trace.min_valid_loss {
                trace.min_valid_loss = valid_loss;
            }

            let checkpoint = Checkpoint {
                epoch,
                step,
                steps_in_epoch,
                elapsed_secs: started.elapsed().as_secs_f64(),
                train_loss: cumulative_loss / step as f64,
                valid_loss,
                min_valid_loss: trace.min_valid_loss,
                learning_rate: ctx.optimizer.learning_rate(),
            };
            debug!("{}", checkpoint);
            trace.checkpoints.push(checkpoint);

            if let Some(stopper) = stopper.as_deref_mut() {
                if let Some(trigger) = stopper.record(checkpoint.train_loss) {
                    return Ok(Some(trigger));
                }
            }
        }
    }

    Ok(None)
}
