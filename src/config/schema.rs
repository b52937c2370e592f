//! YAML schema definitions for declarative training runs

use crate::device::DeviceSelector;
use crate::train::{BlobsSpec, MonitorMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Complete run specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub model: ModelSpec,

    pub data: DataSpec,

    pub optimizer: OptimSpec,

    #[serde(default)]
    pub loss: LossSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,

    /// Optional checkpointing / early stopping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointSpec>,
}

/// Model architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// "linear" | "mlp"
    pub arch: String,

    /// Hidden width (mlp only)
    #[serde(default = "default_hidden")]
    pub hidden: usize,

    /// Dropout probability (mlp only)
    #[serde(default)]
    pub dropout: f32,

    /// Output width; inferred from the data when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<usize>,

    /// Parameter initialization seed
    #[serde(default)]
    pub seed: u64,
}

/// Data configuration
///
/// Exactly one of `train` (a JSON dataset file) or `blobs` (synthetic data)
/// provides the training examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs: Option<BlobsSpec>,

    /// Fraction of the training examples held out for validation
    #[serde(default)]
    pub val_split: f32,

    pub batch_size: usize,

    #[serde(default)]
    pub shuffle: bool,

    /// Shuffle seed
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub drop_last: bool,
}

/// Optimizer specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Optimizer name: "adam" | "sgd"
    pub name: String,

    /// Learning rate
    pub lr: f32,

    /// Optimizer-specific parameters (beta1, beta2, eps, momentum)
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

/// Loss function and its extra parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSpec {
    /// "cross_entropy" | "mse"
    #[serde(default = "default_loss")]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f32>,
}

impl Default for LossSpec {
    fn default() -> Self {
        Self {
            name: default_loss(),
            params: BTreeMap::new(),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Progress line frequency as a fraction of an epoch
    #[serde(default = "default_log_every")]
    pub log_every: f64,

    #[serde(default)]
    pub device: DeviceSelector,

    /// Directory for checkpoints and the final weights
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            log_every: default_log_every(),
            device: DeviceSelector::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Checkpoint policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSpec {
    /// Metric key; `val_loss` with validation, `train_loss` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,

    #[serde(default)]
    pub mode: MonitorMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patience: Option<usize>,

    #[serde(default)]
    pub min_delta: f64,

    /// Overrides `training.output_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl RunSpec {
    /// Whether a validation phase will run
    pub fn has_validation(&self) -> bool {
        self.data.val.is_some() || self.data.val_split > 0.0
    }

    /// Metric key the checkpoint policy watches
    pub fn monitor_key(&self) -> Option<String> {
        let ckpt = self.checkpoint.as_ref()?;
        Some(ckpt.monitor.clone().unwrap_or_else(|| {
            if self.has_validation() {
                "val_loss".to_string()
            } else {
                "train_loss".to_string()
            }
        }))
    }
}

fn default_hidden() -> usize {
    32
}

fn default_loss() -> String {
    "cross_entropy".to_string()
}

fn default_epochs() -> usize {
    10
}

fn default_log_every() -> f64 {
    0.1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./checkpoints")
}
