//! High-level training loop
//!
//! This module provides the training framework:
//! - Data sources and batches
//! - Loss functions (MSE, Cross-Entropy)
//! - Running metrics and throughput
//! - Checkpointing with early stopping
//! - The [`Trainer`] epoch loop and its progress reporting
//!
//! # Example
//!
//! ```no_run
//! use entrenar_fit::device::Device;
//! use entrenar_fit::model::Linear;
//! use entrenar_fit::optim::Sgd;
//! use entrenar_fit::train::{InMemoryDataset, MseLoss, Trainer, TrainerConfig};
//!
//! let xs: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
//! let ys: Vec<f32> = xs.iter().map(|x| 3.0 * x + 1.0).collect();
//! let data = InMemoryDataset::new(xs, 1, ys, 1, 16).unwrap();
//!
//! let model = Linear::new(1, 1, &Device::Cpu, 0).unwrap();
//! let mut trainer = Trainer::new(
//!     model,
//!     Box::new(Sgd::new(0.1, 0.9)),
//!     Box::new(MseLoss),
//!     Box::new(data),
//!     TrainerConfig::default(),
//! )
//! .unwrap();
//!
//! let report = trainer.train().unwrap();
//! assert_eq!(report.epochs_run(), 10);
//! ```

mod batch;
mod checkpoint;
mod clock;
mod config;
mod data;
mod loss;
mod metrics;
mod report;
mod trainer;

pub use batch::Batch;
pub use checkpoint::{CheckpointFile, CheckpointPolicy, ModelCheckpoint, MonitorMode};
pub use clock::{Clock, SystemClock};
pub use config::TrainerConfig;
pub use data::{BlobsSpec, DataSource, DatasetFile, DatasetTargets, InMemoryDataset};
pub use loss::{CrossEntropyLoss, LossFn, LossParams, MseLoss, LABEL_SMOOTHING};
pub use metrics::{mean, throughput, Accuracy, EpochMetrics, MetricAccumulator, MetricMap, Phase};
pub use report::{ConsoleReporter, ProgressLine, ProgressReporter, SilentReporter};
pub use trainer::{EpochRecord, RunOutcome, TrainReport, Trainer};
