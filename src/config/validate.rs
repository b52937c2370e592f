//! Configuration validation

use super::schema::RunSpec;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid model architecture: {0} (must be one of: linear, mlp)")]
    InvalidArchitecture(String),

    #[error("Invalid hidden width: {0} (must be > 0)")]
    InvalidHidden(usize),

    #[error("Invalid dropout: {0} (must be in [0, 1))")]
    InvalidDropout(f32),

    #[error("No training data: set exactly one of data.train or data.blobs")]
    MissingTrainData,

    #[error("Conflicting training data: data.train and data.blobs are both set")]
    ConflictingTrainData,

    #[error("Training data path does not exist: {0}")]
    TrainDataNotFound(String),

    #[error("Validation data path does not exist: {0}")]
    ValDataNotFound(String),

    #[error("Invalid validation split: {0} (must be in [0, 1))")]
    InvalidValSplit(f32),

    #[error("Validation configured twice: data.val and data.val_split")]
    ConflictingValidation,

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid optimizer: {0} (must be one of: adam, sgd)")]
    InvalidOptimizer(String),

    #[error("Invalid loss: {0} (must be one of: cross_entropy, mse)")]
    InvalidLoss(String),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid log_every: {0} (must be a positive fraction)")]
    InvalidLogEvery(f64),

    #[error("Invalid patience: 0 (must be >= 1, or omitted to disable early stopping)")]
    InvalidPatience,

    #[error("Checkpoint monitors '{monitor}' but epochs report {available:?}")]
    InvalidMonitor {
        monitor: String,
        available: Vec<String>,
    },
}

/// Validate a run specification
///
/// Checks:
/// - File paths exist
/// - Numeric values are in valid ranges
/// - Names match supported components
/// - Early-stopping patience is at least one epoch
/// - The checkpoint monitor is a key the configured phases report
pub fn validate_spec(spec: &RunSpec) -> Result<(), ValidationError> {
    let valid_archs = ["linear", "mlp"];
    if !valid_archs.contains(&spec.model.arch.as_str()) {
        return Err(ValidationError::InvalidArchitecture(spec.model.arch.clone()));
    }
    if spec.model.arch == "mlp" {
        if spec.model.hidden == 0 {
            return Err(ValidationError::InvalidHidden(spec.model.hidden));
        }
        if !(0.0..1.0).contains(&spec.model.dropout) {
            return Err(ValidationError::InvalidDropout(spec.model.dropout));
        }
    }

    // Validate data sources
    match (&spec.data.train, &spec.data.blobs) {
        (None, None) => return Err(ValidationError::MissingTrainData),
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingTrainData),
        (Some(path), None) if !path.exists() => {
            return Err(ValidationError::TrainDataNotFound(path.display().to_string()));
        }
        _ => {}
    }
    if let Some(val_path) = &spec.data.val {
        if !val_path.exists() {
            return Err(ValidationError::ValDataNotFound(val_path.display().to_string()));
        }
    }
    if !(0.0..1.0).contains(&spec.data.val_split) {
        return Err(ValidationError::InvalidValSplit(spec.data.val_split));
    }
    if spec.data.val.is_some() && spec.data.val_split > 0.0 {
        return Err(ValidationError::ConflictingValidation);
    }
    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }

    // Validate learning rate
    if spec.optimizer.lr <= 0.0 {
        return Err(ValidationError::InvalidLearningRate(spec.optimizer.lr));
    }

    let valid_optimizers = ["adam", "sgd"];
    if !valid_optimizers.contains(&spec.optimizer.name.to_lowercase().as_str()) {
        return Err(ValidationError::InvalidOptimizer(spec.optimizer.name.clone()));
    }

    let valid_losses = ["cross_entropy", "mse"];
    if !valid_losses.contains(&spec.loss.name.as_str()) {
        return Err(ValidationError::InvalidLoss(spec.loss.name.clone()));
    }

    if spec.training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(spec.training.epochs));
    }
    if !(spec.training.log_every.is_finite() && spec.training.log_every > 0.0) {
        return Err(ValidationError::InvalidLogEvery(spec.training.log_every));
    }

    if spec.checkpoint.as_ref().and_then(|c| c.patience) == Some(0) {
        return Err(ValidationError::InvalidPatience);
    }

    if let Some(monitor) = spec.monitor_key() {
        let prefix = if spec.has_validation() { "val" } else { "train" };
        let available = vec![format!("{prefix}_loss"), format!("{prefix}_acc")];
        if !available.contains(&monitor) {
            return Err(ValidationError::InvalidMonitor { monitor, available });
        }
    }

    Ok(())
}
