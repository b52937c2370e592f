//! Integration tests for the epoch loop.
//!
//! Every collaborator is a deterministic double: a model that always predicts
//! zero, a loss of exactly one per example, a clock that advances one second
//! per reading, and reporters/policies that record what they were told.

use entrenar_fit::device::{Device, DeviceSelector};
use entrenar_fit::model::{Gradients, Linear, Mode, Model, Weights};
use entrenar_fit::optim::{Optimizer, Sgd};
use entrenar_fit::train::{
    throughput, Batch, CheckpointPolicy, Clock, DataSource, EpochMetrics, InMemoryDataset, LossFn,
    LossParams, MetricAccumulator, MetricMap, ModelCheckpoint, MonitorMode, MseLoss, ProgressLine,
    ProgressReporter, Trainer, TrainerConfig,
};
use entrenar_fit::{Error, Result, RunOutcome, Tensor};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

// =============================================================================
// Doubles
// =============================================================================

/// Predicts zero for every row and records mode switches
#[derive(Default)]
struct ConstantModel {
    mode: Mode,
    modes: Rc<RefCell<Vec<Mode>>>,
}

impl Model for ConstantModel {
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        Tensor::matrix(inputs.rows(), 1, vec![0.0; inputs.rows()], false)
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.modes.borrow_mut().push(mode);
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        Vec::new()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        Vec::new()
    }
}

/// Loss of exactly 1.0 for every example
struct UnitLoss;

impl LossFn for UnitLoss {
    fn forward(&self, predictions: &Tensor, _targets: &Tensor, _params: &LossParams) -> Result<Tensor> {
        Ok(Tensor::from_vec(vec![1.0; predictions.rows()], false))
    }

    fn name(&self) -> &str {
        "unit"
    }
}

#[derive(Default)]
struct CountingOptimizer {
    updates: Rc<Cell<usize>>,
}

impl Optimizer for CountingOptimizer {
    fn update(&mut self, _model: &mut dyn Model, _grads: &Gradients) -> Result<()> {
        self.updates.set(self.updates.get() + 1);
        Ok(())
    }

    fn lr(&self) -> f32 {
        0.01
    }

    fn set_lr(&mut self, _lr: f32) {}

    fn name(&self) -> &str {
        "counting"
    }
}

/// `sizes.len()` batches with the given row counts
struct FixedBatches {
    sizes: Vec<usize>,
}

impl FixedBatches {
    fn uniform(batches: usize, size: usize) -> Self {
        Self {
            sizes: vec![size; batches],
        }
    }
}

impl DataSource for FixedBatches {
    fn len(&self) -> usize {
        self.sizes.len()
    }

    fn batches<'a>(&'a mut self, _device: &Device) -> Box<dyn Iterator<Item = Result<Batch>> + 'a> {
        Box::new(self.sizes.iter().map(|&rows| {
            Batch::new(
                Tensor::matrix(rows, 1, vec![0.0; rows], false)?,
                Tensor::from_vec(vec![0.0; rows], false),
            )
        }))
    }
}

/// Fails on the second batch of every pass
struct FailingSource;

impl DataSource for FailingSource {
    fn len(&self) -> usize {
        3
    }

    fn batches<'a>(&'a mut self, _device: &Device) -> Box<dyn Iterator<Item = Result<Batch>> + 'a> {
        Box::new((0..3).map(|i| {
            if i == 1 {
                return Err(Error::Data("disk went away".to_string()));
            }
            Batch::new(
                Tensor::matrix(2, 1, vec![0.0; 2], false)?,
                Tensor::from_vec(vec![0.0; 2], false),
            )
        }))
    }
}

/// Advances one second every time it is read
#[derive(Default)]
struct ManualClock {
    ticks: Cell<u64>,
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        let t = self.ticks.get();
        self.ticks.set(t + 1);
        t as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    EpochBegin(usize),
    Progress(ProgressLine),
    TrainEnd(EpochMetrics),
    ValidationBegin(usize),
    ValidationBatch,
    ValidationEnd(EpochMetrics),
    EpochEnd(usize),
    EarlyStop(usize),
}

#[derive(Default, Clone)]
struct RecordingReporter {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingReporter {
    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    fn progress_lines(&self) -> Vec<ProgressLine> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Progress(line) => Some(*line),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn on_epoch_begin(&mut self, epoch: usize, _max_epochs: usize) {
        self.events.borrow_mut().push(Event::EpochBegin(epoch));
    }

    fn on_progress(&mut self, line: &ProgressLine) {
        self.events.borrow_mut().push(Event::Progress(*line));
    }

    fn on_train_end(&mut self, _epoch_secs: f64, metrics: &EpochMetrics) {
        self.events.borrow_mut().push(Event::TrainEnd(*metrics));
    }

    fn on_validation_begin(&mut self, total_batches: usize) {
        self.events
            .borrow_mut()
            .push(Event::ValidationBegin(total_batches));
    }

    fn on_validation_batch(&mut self) {
        self.events.borrow_mut().push(Event::ValidationBatch);
    }

    fn on_validation_end(&mut self, metrics: &EpochMetrics) {
        self.events
            .borrow_mut()
            .push(Event::ValidationEnd(*metrics));
    }

    fn on_epoch_end(&mut self, epoch: usize) {
        self.events.borrow_mut().push(Event::EpochEnd(epoch));
    }

    fn on_early_stop(&mut self, epoch: usize) {
        self.events.borrow_mut().push(Event::EarlyStop(epoch));
    }
}

/// Records every step and gives up after `stop_after` steps
#[derive(Default, Clone)]
struct RecordingPolicy {
    steps: Rc<RefCell<Vec<(usize, MetricMap)>>>,
    stop_after: Option<usize>,
    monitor: Option<String>,
}

impl CheckpointPolicy for RecordingPolicy {
    fn step(&mut self, epoch: usize, metrics: &MetricMap, _weights: &Weights) -> Result<()> {
        self.steps.borrow_mut().push((epoch, metrics.clone()));
        Ok(())
    }

    fn patience_over(&self) -> bool {
        self.stop_after
            .is_some_and(|n| self.steps.borrow().len() >= n)
    }

    fn monitor(&self) -> Option<&str> {
        self.monitor.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AccEvent {
    Update,
    Compute,
    Reset,
}

/// Logs calls; `compute` returns the number of updates since the last reset
#[derive(Default, Clone)]
struct CountingAccumulator {
    log: Rc<RefCell<Vec<AccEvent>>>,
    seen: usize,
}

impl MetricAccumulator for CountingAccumulator {
    fn update(&mut self, _predictions: &Tensor, _targets: &Tensor) -> Result<()> {
        self.seen += 1;
        self.log.borrow_mut().push(AccEvent::Update);
        Ok(())
    }

    fn compute(&self) -> f64 {
        self.log.borrow_mut().push(AccEvent::Compute);
        self.seen as f64
    }

    fn reset(&mut self) {
        self.seen = 0;
        self.log.borrow_mut().push(AccEvent::Reset);
    }

    fn name(&self) -> &str {
        "count"
    }
}

fn config(epochs: usize) -> TrainerConfig {
    TrainerConfig::new()
        .with_max_epochs(epochs)
        .with_device(DeviceSelector::Cpu)
}

fn trainer(train: FixedBatches, epochs: usize, reporter: &RecordingReporter) -> Trainer<ConstantModel> {
    Trainer::new(
        ConstantModel::default(),
        Box::new(CountingOptimizer::default()),
        Box::new(UnitLoss),
        Box::new(train),
        config(epochs),
    )
    .unwrap()
    .with_clock(Box::new(ManualClock::default()))
    .with_reporter(Box::new(reporter.clone()))
}

// =============================================================================
// Metrics
// =============================================================================

#[test]
fn test_unit_loss_and_throughput() {
    let reporter = RecordingReporter::default();
    let mut t = trainer(FixedBatches::uniform(3, 4), 1, &reporter);

    let report = t.train().unwrap();
    let train = &report.history[0].train;
    assert!((train.mean_loss - 1.0).abs() < 1e-9);
    assert!((train.mean_throughput - 4.0).abs() < 1e-9);
    assert!(report.history[0].val.is_none());
}

#[test]
fn test_progress_lines_every_batch_on_short_epoch() {
    // floor(0.1 * 3) = 0 is clamped to an interval of one
    let reporter = RecordingReporter::default();
    let mut t = trainer(FixedBatches::uniform(3, 4), 1, &reporter);
    t.train().unwrap();

    let lines = reporter.progress_lines();
    assert_eq!(lines.iter().map(|l| l.iter).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(lines.iter().all(|l| l.total == 3));
    assert!(lines.iter().all(|l| (l.throughput - 4.0).abs() < 1e-9));
    assert!(lines.iter().all(|l| (l.lr - 0.01).abs() < 1e-9));
}

#[test]
fn test_progress_lines_follow_log_every() {
    let reporter = RecordingReporter::default();
    let mut t = Trainer::new(
        ConstantModel::default(),
        Box::new(CountingOptimizer::default()),
        Box::new(UnitLoss),
        Box::new(FixedBatches::uniform(10, 2)),
        config(1).with_log_every(0.25),
    )
    .unwrap()
    .with_clock(Box::new(ManualClock::default()))
    .with_reporter(Box::new(reporter.clone()));
    t.train().unwrap();

    let iters: Vec<usize> = reporter.progress_lines().iter().map(|l| l.iter).collect();
    assert_eq!(iters, vec![0, 2, 4, 6, 8]);
}

#[test]
fn test_zero_batch_size_throughput_is_an_error() {
    let err = throughput(0, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, Error::DegenerateThroughput { batch_size: 0 }));
}

#[test]
fn test_zero_duration_throughput_is_finite() {
    assert!(throughput(8, Duration::ZERO).unwrap().is_finite());
}

#[test]
fn test_empty_batches_are_skipped() {
    let reporter = RecordingReporter::default();
    let source = FixedBatches {
        sizes: vec![4, 0, 4],
    };
    let mut t = trainer(source, 1, &reporter);

    let report = t.train().unwrap();
    let train = &report.history[0].train;
    assert!((train.mean_throughput - 4.0).abs() < 1e-9);
    assert_eq!(
        reporter.progress_lines().iter().map(|l| l.iter).collect::<Vec<_>>(),
        vec![0, 2]
    );
}

// =============================================================================
// Phases and accumulators
// =============================================================================

#[test]
fn test_optimizer_updates_once_per_training_batch() {
    let updates = Rc::new(Cell::new(0));
    let optimizer = CountingOptimizer {
        updates: Rc::clone(&updates),
    };
    let mut t = Trainer::new(
        ConstantModel::default(),
        Box::new(optimizer),
        Box::new(UnitLoss),
        Box::new(FixedBatches::uniform(3, 2)),
        config(2),
    )
    .unwrap()
    .with_validation(Box::new(FixedBatches::uniform(5, 2)))
    .with_clock(Box::new(ManualClock::default()))
    .with_reporter(Box::new(RecordingReporter::default()));

    t.train().unwrap();
    assert_eq!(updates.get(), 6);
}

#[test]
fn test_accumulators_reset_between_phases() {
    let train_acc = CountingAccumulator::default();
    let val_acc = CountingAccumulator::default();
    let train_log = Rc::clone(&train_acc.log);
    let val_log = Rc::clone(&val_acc.log);

    let reporter = RecordingReporter::default();
    let mut t = trainer(FixedBatches::uniform(3, 2), 2, &reporter)
        .with_validation(Box::new(FixedBatches::uniform(2, 2)))
        .with_accumulators(Box::new(train_acc), Box::new(val_acc));

    let report = t.train().unwrap();
    for record in &report.history {
        assert_eq!(record.train.accuracy, 3.0);
        assert_eq!(record.val.as_ref().unwrap().accuracy, 2.0);
    }

    // Every compute is preceded by a reset and followed by one
    for (log, per_phase) in [(train_log, 3), (val_log, 2)] {
        let log = log.borrow();
        let mut expected = Vec::new();
        for _ in 0..2 {
            expected.push(AccEvent::Reset);
            expected.extend(vec![AccEvent::Update; per_phase]);
            expected.push(AccEvent::Compute);
            expected.push(AccEvent::Reset);
        }
        assert_eq!(*log, expected);
    }
}

#[test]
fn test_model_mode_per_phase() {
    let modes = Rc::new(RefCell::new(Vec::new()));
    let model = ConstantModel {
        mode: Mode::Train,
        modes: Rc::clone(&modes),
    };
    let mut t = Trainer::new(
        model,
        Box::new(CountingOptimizer::default()),
        Box::new(UnitLoss),
        Box::new(FixedBatches::uniform(1, 2)),
        config(2),
    )
    .unwrap()
    .with_validation(Box::new(FixedBatches::uniform(1, 2)))
    .with_clock(Box::new(ManualClock::default()))
    .with_reporter(Box::new(RecordingReporter::default()));

    t.train().unwrap();
    assert_eq!(
        *modes.borrow(),
        vec![Mode::Train, Mode::Eval, Mode::Train, Mode::Eval]
    );
}

#[test]
fn test_validation_events_in_order() {
    let reporter = RecordingReporter::default();
    let mut t = trainer(FixedBatches::uniform(2, 2), 1, &reporter)
        .with_validation(Box::new(FixedBatches::uniform(2, 3)));
    t.train().unwrap();

    let events = reporter.events.borrow();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::EpochBegin(_) => "begin",
            Event::Progress(_) => "progress",
            Event::TrainEnd(_) => "train_end",
            Event::ValidationBegin(_) => "val_begin",
            Event::ValidationBatch => "val_batch",
            Event::ValidationEnd(_) => "val_end",
            Event::EpochEnd(_) => "end",
            Event::EarlyStop(_) => "early_stop",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "begin", "progress", "progress", "train_end", "val_begin", "val_batch", "val_batch",
            "val_end", "end"
        ]
    );
    match &events[4] {
        Event::ValidationBegin(total) => assert_eq!(*total, 2),
        other => panic!("unexpected event {other:?}"),
    }
    match &events[7] {
        Event::ValidationEnd(metrics) => {
            assert!((metrics.mean_loss - 1.0).abs() < 1e-9);
            assert!((metrics.mean_throughput - 3.0).abs() < 1e-9);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

// =============================================================================
// Checkpoint policy
// =============================================================================

#[test]
fn test_policy_sees_train_metrics_without_validation() {
    let policy = RecordingPolicy::default();
    let steps = Rc::clone(&policy.steps);
    let mut t = trainer(FixedBatches::uniform(2, 2), 2, &RecordingReporter::default())
        .with_checkpoint(Box::new(policy));

    t.train().unwrap();
    let steps = steps.borrow();
    assert_eq!(steps.len(), 2);
    for (i, (epoch, metrics)) in steps.iter().enumerate() {
        assert_eq!(*epoch, i);
        assert_eq!(
            metrics.keys().cloned().collect::<Vec<_>>(),
            vec!["train_acc".to_string(), "train_loss".to_string()]
        );
        assert!((metrics["train_loss"] - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_policy_sees_validation_metrics() {
    let policy = RecordingPolicy::default();
    let steps = Rc::clone(&policy.steps);
    let mut t = trainer(FixedBatches::uniform(2, 2), 1, &RecordingReporter::default())
        .with_validation(Box::new(FixedBatches::uniform(1, 2)))
        .with_checkpoint(Box::new(policy));

    t.train().unwrap();
    let steps = steps.borrow();
    assert_eq!(
        steps[0].1.keys().cloned().collect::<Vec<_>>(),
        vec!["val_acc".to_string(), "val_loss".to_string()]
    );
}

#[test]
fn test_early_stop_skips_remaining_epochs() {
    let reporter = RecordingReporter::default();
    let policy = RecordingPolicy {
        stop_after: Some(1),
        ..RecordingPolicy::default()
    };
    let mut t = trainer(FixedBatches::uniform(2, 2), 5, &reporter)
        .with_validation(Box::new(FixedBatches::uniform(1, 2)))
        .with_checkpoint(Box::new(policy));

    let report = t.train().unwrap();
    assert_eq!(report.outcome, RunOutcome::StoppedEarly { epoch: 0 });
    assert!(report.stopped_early());
    assert_eq!(report.epochs_run(), 1);
    assert_eq!(reporter.count(|e| matches!(e, Event::EpochBegin(_))), 1);
    assert_eq!(reporter.count(|e| matches!(e, Event::ValidationBegin(_))), 1);
    assert_eq!(reporter.count(|e| matches!(e, Event::EarlyStop(0))), 1);
    assert_eq!(reporter.count(|e| matches!(e, Event::EpochEnd(_))), 0);
}

#[test]
fn test_model_checkpoint_patience_one() {
    // Loss never moves, so epoch 1 is the first without improvement
    let dir = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let policy = ModelCheckpoint::new(dir.path(), "train_loss", MonitorMode::Min).with_patience(1);
    let mut t = trainer(FixedBatches::uniform(3, 4), 10, &reporter).with_checkpoint(Box::new(policy));

    let report = t.train().unwrap();
    assert_eq!(report.outcome, RunOutcome::StoppedEarly { epoch: 1 });
    assert_eq!(reporter.count(|e| matches!(e, Event::EpochBegin(_))), 2);
    assert!(dir.path().join("checkpoint_epoch_0.json").exists());
    assert!(!dir.path().join("checkpoint_epoch_1.json").exists());
}

/// Predicts zero in training and `script[k]` during the k-th validation pass
struct ScriptedModel {
    mode: Mode,
    val_passes: usize,
    script: Vec<f32>,
}

impl Model for ScriptedModel {
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        let value = match self.mode {
            Mode::Train => 0.0,
            Mode::Eval => self.script[self.val_passes - 1],
        };
        Tensor::matrix(inputs.rows(), 1, vec![value; inputs.rows()], false)
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Eval {
            self.val_passes += 1;
        }
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        Vec::new()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        Vec::new()
    }
}

/// Per-example loss equal to the prediction
struct IdentityLoss;

impl LossFn for IdentityLoss {
    fn forward(&self, predictions: &Tensor, _targets: &Tensor, _params: &LossParams) -> Result<Tensor> {
        Ok(Tensor::from_vec(predictions.data().to_vec(), false))
    }

    fn name(&self) -> &str {
        "identity"
    }
}

#[test]
fn test_val_loss_worsens_after_patience_one() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let model = ScriptedModel {
        mode: Mode::Train,
        val_passes: 0,
        script: vec![0.5, 0.9, 0.1],
    };
    let policy = ModelCheckpoint::new(dir.path(), "val_loss", MonitorMode::Min).with_patience(1);
    let mut t = Trainer::new(
        model,
        Box::new(CountingOptimizer::default()),
        Box::new(IdentityLoss),
        Box::new(FixedBatches::uniform(2, 2)),
        config(3),
    )
    .unwrap()
    .with_validation(Box::new(FixedBatches::uniform(1, 2)))
    .with_checkpoint(Box::new(policy))
    .with_clock(Box::new(ManualClock::default()))
    .with_reporter(Box::new(reporter.clone()));

    let report = t.train().unwrap();
    assert_eq!(report.outcome, RunOutcome::StoppedEarly { epoch: 1 });
    assert_eq!(reporter.count(|e| matches!(e, Event::EpochBegin(_))), 2);
    let val_losses: Vec<f64> = report
        .history
        .iter()
        .map(|r| r.val.as_ref().unwrap().mean_loss)
        .collect();
    assert!((val_losses[0] - 0.5).abs() < 1e-6);
    assert!((val_losses[1] - 0.9).abs() < 1e-6);

    let best = entrenar_fit::train::CheckpointFile::load(dir.path().join("checkpoint_best.json")).unwrap();
    assert_eq!(best.epoch, 0);
}

#[test]
fn test_monitor_key_mismatch_rejected_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let policy = ModelCheckpoint::new(dir.path(), "val_loss", MonitorMode::Min);
    let mut t = trainer(FixedBatches::uniform(2, 2), 3, &reporter).with_checkpoint(Box::new(policy));

    let err = t.train().unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
    assert!(reporter.events.borrow().is_empty());
}

#[test]
fn test_custom_policy_monitor_checked() {
    let policy = RecordingPolicy {
        monitor: Some("val_acc".to_string()),
        ..RecordingPolicy::default()
    };
    let t = trainer(FixedBatches::uniform(2, 2), 1, &RecordingReporter::default())
        .with_validation(Box::new(FixedBatches::uniform(1, 2)))
        .with_checkpoint(Box::new(policy));
    assert!(t.validate().is_ok());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_data_error_aborts_run() {
    let mut t = Trainer::new(
        ConstantModel::default(),
        Box::new(CountingOptimizer::default()),
        Box::new(UnitLoss),
        Box::new(FailingSource),
        config(3),
    )
    .unwrap()
    .with_reporter(Box::new(RecordingReporter::default()));

    match t.train() {
        Err(Error::Data(msg)) => assert_eq!(msg, "disk went away"),
        other => panic!("expected data error, got {other:?}"),
    }
}

#[test]
fn test_empty_training_source_rejected() {
    let result = Trainer::new(
        ConstantModel::default(),
        Box::new(CountingOptimizer::default()),
        Box::new(UnitLoss),
        Box::new(FixedBatches { sizes: Vec::new() }),
        config(1),
    );
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_empty_validation_source_rejected() {
    let mut t = trainer(FixedBatches::uniform(2, 2), 1, &RecordingReporter::default())
        .with_validation(Box::new(FixedBatches { sizes: Vec::new() }));
    assert!(matches!(t.train(), Err(Error::ConfigError(_))));
}

// =============================================================================
// Multi-output regression
// =============================================================================

#[test]
fn test_linear_mse_on_two_column_targets() {
    // y = (x, 2x); the larger column is always the second one for x > 0
    let xs: Vec<f32> = (1..=8).map(|i| i as f32 / 8.0).collect();
    let ys: Vec<f32> = xs.iter().flat_map(|&x| [x, 2.0 * x]).collect();
    let data = InMemoryDataset::new(xs.clone(), 1, ys.clone(), 2, 2).unwrap();
    let val = InMemoryDataset::new(xs, 1, ys, 2, 4).unwrap();

    let model = Linear::new(1, 2, &Device::Cpu, 0).unwrap();
    let mut t = Trainer::new(
        model,
        Box::new(Sgd::new(0.1, 0.0)),
        Box::new(MseLoss),
        Box::new(data),
        config(30),
    )
    .unwrap()
    .with_validation(Box::new(val))
    .with_reporter(Box::new(RecordingReporter::default()));

    let report = t.train().unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed { epochs: 30 });
    let first = report.history[0].train.mean_loss;
    let last = report.last_epoch().unwrap();
    assert!(last.train.mean_loss < first, "loss {first} -> {}", last.train.mean_loss);
    let val = last.val.as_ref().unwrap();
    assert!((0.0..=1.0).contains(&val.accuracy));
}
