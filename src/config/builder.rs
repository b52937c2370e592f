//! Build training components from configuration

use super::schema::{DataSpec, LossSpec, ModelSpec, OptimSpec, RunSpec};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::model::{Linear, Mlp, Model};
use crate::optim::{Adam, Optimizer, Sgd};
use crate::train::{
    CrossEntropyLoss, InMemoryDataset, LossFn, ModelCheckpoint, MseLoss, TrainerConfig,
};

fn param(spec: &OptimSpec, name: &str, default: f32) -> f32 {
    spec.params
        .get(name)
        .and_then(|v| v.as_f64())
        .map_or(default, |v| v as f32)
}

/// Build optimizer from configuration
pub fn build_optimizer(spec: &OptimSpec) -> Result<Box<dyn Optimizer>> {
    match spec.name.to_lowercase().as_str() {
        "sgd" => Ok(Box::new(Sgd::new(spec.lr, param(spec, "momentum", 0.0)))),
        "adam" => Ok(Box::new(Adam::new(
            spec.lr,
            param(spec, "beta1", 0.9),
            param(spec, "beta2", 0.999),
            param(spec, "eps", 1e-8),
        ))),
        name => Err(Error::ConfigError(format!(
            "Unknown optimizer: {name}. Supported: sgd, adam"
        ))),
    }
}

/// Build loss function from configuration
pub fn build_loss(spec: &LossSpec) -> Result<Box<dyn LossFn>> {
    match spec.name.as_str() {
        "cross_entropy" => Ok(Box::new(CrossEntropyLoss)),
        "mse" => Ok(Box::new(MseLoss)),
        name => Err(Error::ConfigError(format!(
            "Unknown loss: {name}. Supported: cross_entropy, mse"
        ))),
    }
}

/// Training and optional validation datasets
pub fn build_data(spec: &DataSpec) -> Result<(InMemoryDataset, Option<InMemoryDataset>)> {
    let train = match (&spec.train, &spec.blobs) {
        (Some(path), _) => InMemoryDataset::from_json(path, spec.batch_size)?,
        (None, Some(blobs)) => InMemoryDataset::blobs(blobs, spec.batch_size)?,
        (None, None) => {
            return Err(Error::ConfigError("no training data configured".to_string()));
        }
    };

    let (train, val) = match &spec.val {
        Some(path) => (train, Some(InMemoryDataset::from_json(path, spec.batch_size)?)),
        None if spec.val_split > 0.0 => {
            let (train, val) = train.split(spec.val_split)?;
            (train, Some(val))
        }
        None => (train, None),
    };

    let mut train = train.with_drop_last(spec.drop_last);
    if spec.shuffle {
        train = train.with_shuffle(spec.seed);
    }
    Ok((train, val))
}

/// Output width: explicit, else class count for classification or target
/// width for regression
pub fn infer_outputs(spec: &RunSpec, train: &InMemoryDataset, val: Option<&InMemoryDataset>) -> usize {
    if let Some(outputs) = spec.model.outputs {
        return outputs;
    }
    match spec.loss.name.as_str() {
        "cross_entropy" => val
            .map_or(0, InMemoryDataset::num_classes)
            .max(train.num_classes()),
        _ => train.target_width(),
    }
}

/// Build a model on `device`
pub fn build_model(
    spec: &ModelSpec,
    in_features: usize,
    outputs: usize,
    device: &Device,
) -> Result<Box<dyn Model>> {
    match spec.arch.as_str() {
        "linear" => Ok(Box::new(Linear::new(in_features, outputs, device, spec.seed)?)),
        "mlp" => Ok(Box::new(Mlp::new(
            in_features,
            spec.hidden,
            outputs,
            spec.dropout,
            device,
            spec.seed,
        )?)),
        arch => Err(Error::ConfigError(format!(
            "Unknown model architecture: {arch}. Supported: linear, mlp"
        ))),
    }
}

/// Checkpoint policy, when configured
pub fn build_checkpoint(spec: &RunSpec) -> Option<ModelCheckpoint> {
    let ckpt = spec.checkpoint.as_ref()?;
    let monitor = spec.monitor_key()?;
    let dir = ckpt
        .dir
        .clone()
        .unwrap_or_else(|| spec.training.output_dir.clone());

    let mut policy = ModelCheckpoint::new(dir, monitor, ckpt.mode).with_min_delta(ckpt.min_delta);
    if let Some(patience) = ckpt.patience {
        policy = policy.with_patience(patience);
    }
    Some(policy)
}

pub fn trainer_config(spec: &RunSpec) -> TrainerConfig {
    let mut config = TrainerConfig::new()
        .with_max_epochs(spec.training.epochs)
        .with_log_every(spec.training.log_every)
        .with_device(spec.training.device);
    config.loss_params = spec.loss.params.clone();
    config
}
