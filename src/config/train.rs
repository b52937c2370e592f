//! Single-command training from YAML configuration

use super::builder::{
    build_checkpoint, build_data, build_loss, build_model, build_optimizer, infer_outputs,
    trainer_config,
};
use super::schema::RunSpec;
use super::validate::validate_spec;
use crate::error::{Error, Result};
use crate::model::get_weights;
use crate::train::{ConsoleReporter, ProgressReporter, TrainReport, Trainer};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the weights written after a run
pub const FINAL_WEIGHTS: &str = "final_weights.json";

/// Train a model from YAML configuration file
///
/// This is the main entry point for declarative training. It:
/// 1. Loads, parses and validates the YAML config
/// 2. Builds the data, model, optimizer, loss and checkpoint policy
/// 3. Runs the training loop
/// 4. Saves the final weights to `training.output_dir`
///
/// # Example
///
/// ```no_run
/// use entrenar_fit::config::train_from_yaml;
///
/// let report = train_from_yaml("config.yaml")?;
/// println!("{}", report.outcome);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn train_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<TrainReport> {
    let spec = load_config(config_path)?;
    train_from_spec(&spec, Box::new(ConsoleReporter::new()))
}

/// Run a validated spec, reporting progress through `reporter`
pub fn train_from_spec(spec: &RunSpec, reporter: Box<dyn ProgressReporter>) -> Result<TrainReport> {
    validate_spec(spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    let config = trainer_config(spec);
    let device = config.device.resolve()?;
    tracing::info!(requested = ?config.device, %device, "resolved device");

    let (train, val) = build_data(&spec.data)?;
    let outputs = infer_outputs(spec, &train, val.as_ref());
    let model = build_model(&spec.model, train.num_features(), outputs, &device)?;
    tracing::info!(
        arch = %spec.model.arch,
        parameters = model.num_parameters(),
        train_examples = train.num_examples(),
        val_examples = val.as_ref().map_or(0, |v| v.num_examples()),
        "built model and data"
    );

    let mut trainer = Trainer::on_device(
        model,
        build_optimizer(&spec.optimizer)?,
        build_loss(&spec.loss)?,
        Box::new(train),
        config,
        device,
    )?
    .with_reporter(reporter);
    if let Some(val) = val {
        trainer = trainer.with_validation(Box::new(val));
    }
    if let Some(policy) = build_checkpoint(spec) {
        trainer = trainer.with_checkpoint(Box::new(policy));
    }

    let report = trainer.train()?;
    let path = save_final_weights(&spec.training.output_dir, &get_weights(trainer.model()))?;
    tracing::info!(outcome = %report.outcome, path = %path.display(), "saved final weights");
    Ok(report)
}

fn save_final_weights(dir: &Path, weights: &crate::model::Weights) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(FINAL_WEIGHTS);
    weights.save_json(&path)?;
    Ok(path)
}

/// Load run spec from YAML file (without running training)
///
/// Useful for testing config parsing and validation separately from training.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<RunSpec> {
    let spec = parse_config(config_path)?;
    validate_spec(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;
    Ok(spec)
}

/// Parse without validating, so overrides can be applied first
pub fn parse_config<P: AsRef<Path>>(config_path: P) -> Result<RunSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))
}
