//! Epoch-level training loop
//!
//! The [`Trainer`] owns the model and its collaborators for the length of a
//! run. Each epoch runs a training phase, an optional validation phase, then
//! hands the phase metrics to the checkpoint policy and checks for early
//! stopping.

use super::checkpoint::CheckpointPolicy;
use super::clock::{Clock, SystemClock};
use super::config::TrainerConfig;
use super::data::DataSource;
use super::loss::{LossFn, LossParams};
use super::metrics::{mean, throughput, Accuracy, EpochMetrics, MetricAccumulator, MetricMap, Phase};
use super::report::{ConsoleReporter, ProgressLine, ProgressReporter};
use super::Batch;
use crate::autograd::{self, Tensor};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::model::{get_weights, value_and_grad, Mode, Model};
use crate::optim::{Optimizer, LEARNING_RATE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every scheduled epoch ran
    Completed { epochs: usize },
    /// The checkpoint policy ran out of patience after `epoch`
    StoppedEarly { epoch: usize },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed { epochs } => write!(f, "completed {epochs} epochs"),
            RunOutcome::StoppedEarly { epoch } => write!(f, "stopped early at epoch {epoch}"),
        }
    }
}

/// Metrics of one finished epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train: EpochMetrics,
    pub val: Option<EpochMetrics>,
    pub duration_secs: f64,
}

impl EpochRecord {
    /// Validation metrics when validation ran, training metrics otherwise
    pub fn checkpoint_metrics(&self) -> MetricMap {
        match &self.val {
            Some(val) => val.to_map(Phase::Val),
            None => self.train.to_map(Phase::Train),
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub outcome: RunOutcome,
    pub history: Vec<EpochRecord>,
    pub elapsed_secs: f64,
}

impl TrainReport {
    pub fn stopped_early(&self) -> bool {
        matches!(self.outcome, RunOutcome::StoppedEarly { .. })
    }

    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }

    pub fn last_epoch(&self) -> Option<&EpochRecord> {
        self.history.last()
    }
}

/// Everything a single step reads or mutates
struct StepState<M> {
    model: M,
    optimizer: Box<dyn Optimizer>,
    loss_fn: Box<dyn LossFn>,
    loss_params: LossParams,
    train_acc: Box<dyn MetricAccumulator>,
    val_acc: Box<dyn MetricAccumulator>,
    device: Device,
}

impl<M: Model> StepState<M> {
    fn train_step(&mut self, batch: &Batch) -> Result<f32> {
        let loss_fn = self.loss_fn.as_ref();
        let params = &self.loss_params;
        let (loss, predictions, grads) = value_and_grad(&mut self.model, |model| {
            let predictions = model.forward(&batch.inputs)?;
            let losses = loss_fn.forward(&predictions, &batch.targets, params)?;
            Ok((Trainer::<M>::reduce_loss(&losses), predictions.detach()))
        })?;

        self.train_acc.update(&predictions, &batch.targets)?;
        self.optimizer.update(&mut self.model, &grads)?;
        self.device.synchronize(&self.model, self.optimizer.as_ref())?;
        Ok(loss)
    }

    /// Runs in eval mode and restores the previous mode afterwards, on error too
    fn val_step(&mut self, batch: &Batch) -> Result<f32> {
        let previous = self.model.mode();
        if previous != Mode::Eval {
            self.model.set_mode(Mode::Eval);
        }
        let result = self.eval_batch(batch);
        if previous != Mode::Eval {
            self.model.set_mode(previous);
        }
        result
    }

    fn eval_batch(&mut self, batch: &Batch) -> Result<f32> {
        let predictions = self.model.forward(&batch.inputs)?.detach();
        self.val_acc.update(&predictions, &batch.targets)?;
        let losses = self
            .loss_fn
            .forward(&predictions, &batch.targets, &self.loss_params)?;
        Ok(Trainer::<M>::reduce_loss(&losses).data()[0])
    }

    fn learning_rate(&self) -> f32 {
        self.optimizer
            .state()
            .get(LEARNING_RATE)
            .copied()
            .unwrap_or_else(|| self.optimizer.lr())
    }
}

fn elapsed(tic: f64, toc: f64) -> Duration {
    Duration::try_from_secs_f64(toc - tic).unwrap_or(Duration::ZERO)
}

/// Supervised training loop
///
/// # Example
///
/// ```no_run
/// use entrenar_fit::device::Device;
/// use entrenar_fit::model::Mlp;
/// use entrenar_fit::optim::Adam;
/// use entrenar_fit::train::{BlobsSpec, CrossEntropyLoss, InMemoryDataset, Trainer, TrainerConfig};
///
/// let spec = BlobsSpec { examples: 512, classes: 3, features: 2, spread: 1.0, seed: 0 };
/// let data = InMemoryDataset::blobs(&spec, 32).unwrap().with_shuffle(0);
/// let (train, val) = data.split(0.2).unwrap();
/// let model = Mlp::new(2, 16, 3, 0.1, &Device::Cpu, 0).unwrap();
///
/// let mut trainer = Trainer::new(
///     model,
///     Box::new(Adam::default_params(1e-2)),
///     Box::new(CrossEntropyLoss),
///     Box::new(train),
///     TrainerConfig::new().with_max_epochs(5),
/// )
/// .unwrap()
/// .with_validation(Box::new(val));
///
/// let report = trainer.train().unwrap();
/// println!("{}", report.outcome);
/// ```
pub struct Trainer<M: Model> {
    steps: StepState<M>,
    train_data: Box<dyn DataSource>,
    val_data: Option<Box<dyn DataSource>>,
    checkpoint: Option<Box<dyn CheckpointPolicy>>,
    reporter: Box<dyn ProgressReporter>,
    clock: Box<dyn Clock>,
    config: TrainerConfig,
}

impl<M: Model> Trainer<M> {
    /// Create a trainer with accuracy accumulators, console output and the
    /// system clock
    ///
    /// Fails on an invalid config, an empty training source, or a device that
    /// is not available.
    pub fn new(
        model: M,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn LossFn>,
        train_data: Box<dyn DataSource>,
        config: TrainerConfig,
    ) -> Result<Self> {
        let device = config.device.resolve()?;
        tracing::info!(requested = ?config.device, %device, "resolved device");
        Self::on_device(model, optimizer, loss_fn, train_data, config, device)
    }

    /// Like [`Trainer::new`], for a model already built on `device`
    ///
    /// `config.device` is not consulted again.
    pub fn on_device(
        model: M,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn LossFn>,
        train_data: Box<dyn DataSource>,
        config: TrainerConfig,
        device: Device,
    ) -> Result<Self> {
        config.validate()?;
        if train_data.is_empty() {
            return Err(Error::ConfigError("training source yields no batches".to_string()));
        }
        device.synchronize(&model, optimizer.as_ref())?;

        Ok(Self {
            steps: StepState {
                model,
                optimizer,
                loss_fn,
                loss_params: config.loss_params.clone(),
                train_acc: Box::new(Accuracy::default()),
                val_acc: Box::new(Accuracy::default()),
                device,
            },
            train_data,
            val_data: None,
            checkpoint: None,
            reporter: Box::new(ConsoleReporter::new()),
            clock: Box::new(SystemClock::new()),
            config,
        })
    }

    /// Run a validation pass after every training phase
    pub fn with_validation(mut self, val_data: Box<dyn DataSource>) -> Self {
        self.val_data = Some(val_data);
        self
    }

    pub fn with_checkpoint(mut self, policy: Box<dyn CheckpointPolicy>) -> Self {
        self.checkpoint = Some(policy);
        self
    }

    /// Replace the training and validation accumulators
    pub fn with_accumulators(
        mut self,
        train: Box<dyn MetricAccumulator>,
        val: Box<dyn MetricAccumulator>,
    ) -> Self {
        self.steps.train_acc = train;
        self.steps.val_acc = val;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn model(&self) -> &M {
        &self.steps.model
    }

    /// Hand the trained model back to the caller
    pub fn into_model(self) -> M {
        self.steps.model
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.steps.optimizer.as_ref()
    }

    pub fn device(&self) -> Device {
        self.steps.device
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Check that the configured phases can feed the checkpoint policy
    pub fn validate(&self) -> Result<()> {
        if self.val_data.as_ref().is_some_and(|v| v.is_empty()) {
            return Err(Error::ConfigError("validation source yields no batches".to_string()));
        }
        let Some(key) = self.checkpoint.as_ref().and_then(|p| p.monitor()) else {
            return Ok(());
        };
        let phase = if self.val_data.is_some() {
            Phase::Val
        } else {
            Phase::Train
        };
        let supplied = [phase.loss_key(), phase.acc_key()];
        if !supplied.iter().any(|k| k == key) {
            return Err(Error::ConfigError(format!(
                "checkpoint monitors '{key}' but epochs only report {supplied:?}"
            )));
        }
        Ok(())
    }

    /// Mean of per-example losses
    pub fn reduce_loss(losses: &Tensor) -> Tensor {
        autograd::mean(losses)
    }

    /// One optimization step; returns the batch's mean loss
    ///
    /// Feeds the training accumulator exactly once.
    pub fn train_step(&mut self, batch: &Batch) -> Result<f32> {
        self.steps.train_step(batch)
    }

    /// Forward-only step that feeds the validation accumulator
    ///
    /// The model runs in eval mode for the step and gets its previous mode
    /// back afterwards.
    pub fn val_step(&mut self, batch: &Batch) -> Result<f32> {
        self.steps.val_step(batch)
    }

    /// One full pass over the training source
    pub fn train_epoch(&mut self) -> Result<EpochMetrics> {
        self.steps.model.set_mode(Mode::Train);
        self.steps.train_acc.reset();

        let total = self.train_data.len();
        let interval = self.config.log_interval(total);
        let mut losses = Vec::with_capacity(total);
        let mut throughputs = Vec::with_capacity(total);

        let device = self.steps.device;
        for (i, batch) in self.train_data.batches(&device).enumerate() {
            let batch = batch?;
            if batch.is_empty() {
                tracing::warn!(batch = i, "skipping empty training batch");
                continue;
            }

            let tic = self.clock.now();
            let loss = self.steps.train_step(&batch)?;
            let toc = self.clock.now();

            let batch_throughput = throughput(batch.size(), elapsed(tic, toc))?;
            losses.push(f64::from(loss));
            throughputs.push(batch_throughput);

            if i % interval == 0 {
                self.reporter.on_progress(&ProgressLine {
                    iter: i,
                    total,
                    loss,
                    throughput: batch_throughput,
                    lr: self.steps.learning_rate(),
                });
            }
        }

        let accuracy = self.steps.train_acc.compute();
        self.steps.train_acc.reset();
        Ok(EpochMetrics {
            mean_loss: mean(&losses),
            accuracy,
            mean_throughput: mean(&throughputs),
        })
    }

    /// One full pass over the validation source; `None` when none is set
    pub fn val_epoch(&mut self) -> Result<Option<EpochMetrics>> {
        let Some(val_data) = self.val_data.as_mut() else {
            return Ok(None);
        };
        self.steps.model.set_mode(Mode::Eval);
        self.steps.val_acc.reset();

        let total = val_data.len();
        self.reporter.on_validation_begin(total);
        let mut losses = Vec::with_capacity(total);
        let mut throughputs = Vec::with_capacity(total);

        let device = self.steps.device;
        for (i, batch) in val_data.batches(&device).enumerate() {
            let batch = batch?;
            if batch.is_empty() {
                tracing::warn!(batch = i, "skipping empty validation batch");
                continue;
            }

            let tic = self.clock.now();
            let loss = self.steps.val_step(&batch)?;
            let toc = self.clock.now();

            throughputs.push(throughput(batch.size(), elapsed(tic, toc))?);
            losses.push(f64::from(loss));
            self.reporter.on_validation_batch();
        }

        let accuracy = self.steps.val_acc.compute();
        self.steps.val_acc.reset();
        let metrics = EpochMetrics {
            mean_loss: mean(&losses),
            accuracy,
            mean_throughput: mean(&throughputs),
        };
        self.reporter.on_validation_end(&metrics);
        Ok(Some(metrics))
    }

    /// Run up to `max_epochs` epochs
    ///
    /// Any collaborator error aborts the run and is returned unchanged.
    pub fn train(&mut self) -> Result<TrainReport> {
        self.validate()?;

        let max_epochs = self.config.max_epochs;
        let run_start = self.clock.now();
        let mut history = Vec::with_capacity(max_epochs);
        tracing::info!(
            max_epochs,
            train_batches = self.train_data.len(),
            validation = self.val_data.is_some(),
            device = %self.steps.device,
            "starting training"
        );

        for epoch in 0..max_epochs {
            self.reporter.on_epoch_begin(epoch, max_epochs);

            let tic = self.clock.now();
            let train = self.train_epoch()?;
            let train_secs = self.clock.now() - tic;
            self.reporter.on_train_end(train_secs, &train);

            let val = self.val_epoch()?;
            let record = EpochRecord {
                epoch,
                train,
                val,
                duration_secs: self.clock.now() - tic,
            };
            tracing::debug!(epoch, ?record.train, ?record.val, "epoch finished");
            let metrics = record.checkpoint_metrics();
            history.push(record);

            if let Some(policy) = self.checkpoint.as_mut() {
                policy.step(epoch, &metrics, &get_weights(&self.steps.model))?;
                if policy.patience_over() {
                    tracing::info!(epoch, "patience exhausted, stopping early");
                    self.reporter.on_early_stop(epoch);
                    return Ok(TrainReport {
                        outcome: RunOutcome::StoppedEarly { epoch },
                        history,
                        elapsed_secs: self.clock.now() - run_start,
                    });
                }
            }
            self.reporter.on_epoch_end(epoch);
        }

        let elapsed_secs = self.clock.now() - run_start;
        tracing::info!(epochs = max_epochs, elapsed_secs, "training complete");
        Ok(TrainReport {
            outcome: RunOutcome::Completed { epochs: max_epochs },
            history,
            elapsed_secs,
        })
    }
}
