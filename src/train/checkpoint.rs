//! Checkpointing and early stopping
//!
//! The trainer hands every epoch's metrics and a weight snapshot to a
//! [`CheckpointPolicy`]. The policy decides whether to persist the weights and
//! whether patience has run out; the trainer only reads
//! [`CheckpointPolicy::patience_over`] back.

use super::MetricMap;
use crate::error::{Error, Result};
use crate::model::Weights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-epoch checkpoint and early-stop decision
pub trait CheckpointPolicy {
    fn step(&mut self, epoch: usize, metrics: &MetricMap, weights: &Weights) -> Result<()>;

    /// True once the monitored metric has stopped improving for long enough
    fn patience_over(&self) -> bool;

    /// Metric key this policy needs in every `step` call
    fn monitor(&self) -> Option<&str> {
        None
    }
}

/// Direction in which the monitored metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    #[default]
    Min,
    Max,
}

/// Contents of a checkpoint file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub epoch: usize,
    pub monitor: String,
    pub value: f64,
    pub metrics: MetricMap,
    pub saved_at: DateTime<Utc>,
    pub weights: Weights,
}

impl CheckpointFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Checkpoint(format!("invalid checkpoint {}: {e}", path.display())))
    }
}

/// Saves weights when a monitored metric improves and tracks patience
///
/// # Example
///
/// ```
/// use entrenar_fit::train::{CheckpointPolicy, ModelCheckpoint, MonitorMode};
///
/// let ckpt = ModelCheckpoint::new("checkpoints", "val_loss", MonitorMode::Min)
///     .with_patience(3)
///     .with_min_delta(1e-3);
/// assert_eq!(ckpt.monitor(), Some("val_loss"));
/// assert!(!ckpt.patience_over());
/// ```
#[derive(Debug, Clone)]
pub struct ModelCheckpoint {
    output_dir: PathBuf,
    monitor: String,
    mode: MonitorMode,
    /// None disables early stopping
    patience: Option<usize>,
    min_delta: f64,
    best: Option<f64>,
    best_epoch: Option<usize>,
    epochs_without_improvement: usize,
}

impl ModelCheckpoint {
    pub fn new(output_dir: impl Into<PathBuf>, monitor: impl Into<String>, mode: MonitorMode) -> Self {
        Self {
            output_dir: output_dir.into(),
            monitor: monitor.into(),
            mode,
            patience: None,
            min_delta: 0.0,
            best: None,
            best_epoch: None,
            epochs_without_improvement: 0,
        }
    }

    /// Stop after `patience` consecutive epochs without improvement
    ///
    /// Zero is treated as one: the first non-improving epoch ends the run.
    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = Some(patience.max(1));
        self
    }

    /// Smallest change that counts as an improvement
    pub fn with_min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta.abs();
        self
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn epochs_without_improvement(&self) -> usize {
        self.epochs_without_improvement
    }

    /// Path for the checkpoint written at `epoch`
    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.output_dir
            .join(format!("checkpoint_epoch_{epoch}.json"))
    }

    /// Path that always holds the best checkpoint so far
    pub fn best_checkpoint_path(&self) -> PathBuf {
        self.output_dir.join("checkpoint_best.json")
    }

    fn improves(&self, value: f64) -> bool {
        match (self.best, self.mode) {
            (None, _) => value.is_finite(),
            (Some(best), MonitorMode::Min) => value < best - self.min_delta,
            (Some(best), MonitorMode::Max) => value > best + self.min_delta,
        }
    }

    fn save(&self, epoch: usize, value: f64, metrics: &MetricMap, weights: &Weights) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let file = CheckpointFile {
            epoch,
            monitor: self.monitor.clone(),
            value,
            metrics: metrics.clone(),
            saved_at: Utc::now(),
            weights: weights.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let path = self.checkpoint_path(epoch);
        fs::write(&path, &json)?;
        fs::write(self.best_checkpoint_path(), &json)?;
        Ok(path)
    }
}

impl CheckpointPolicy for ModelCheckpoint {
    fn step(&mut self, epoch: usize, metrics: &MetricMap, weights: &Weights) -> Result<()> {
        let value = *metrics.get(&self.monitor).ok_or_else(|| {
            Error::Checkpoint(format!("metric '{}' missing from epoch {epoch}", self.monitor))
        })?;

        if self.improves(value) {
            let path = self.save(epoch, value, metrics, weights)?;
            tracing::info!(
                epoch,
                monitor = %self.monitor,
                value,
                previous = ?self.best,
                path = %path.display(),
                "checkpoint saved"
            );
            self.best = Some(value);
            self.best_epoch = Some(epoch);
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
            tracing::debug!(
                epoch,
                monitor = %self.monitor,
                value,
                epochs_without_improvement = self.epochs_without_improvement,
                "no improvement"
            );
        }
        Ok(())
    }

    fn patience_over(&self) -> bool {
        self.patience
            .is_some_and(|p| self.epochs_without_improvement >= p)
    }

    fn monitor(&self) -> Option<&str> {
        Some(&self.monitor)
    }
}
