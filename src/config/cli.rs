//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! entrenar-fit train config.yaml
//! entrenar-fit train config.yaml --epochs 5 --log-every 0.25 --device cpu
//! entrenar-fit validate config.yaml
//! entrenar-fit info config.yaml --format json
//! ```

use super::schema::RunSpec;
use crate::device::DeviceSelector;
use crate::error::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// entrenar-fit: supervised training loop
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "entrenar-fit")]
#[command(version)]
#[command(about = "Train models from declarative YAML run specifications")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a model from YAML configuration
    Train(TrainArgs),

    /// Validate a configuration file without training
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override number of epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Override progress frequency (fraction of an epoch)
    #[arg(long)]
    pub log_every: Option<f64>,

    /// Override compute device
    #[arg(long, value_enum)]
    pub device: Option<DeviceSelector>,

    /// Override output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for info command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {s}. Valid formats: text, json, yaml"
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a RunSpec
pub fn apply_overrides(spec: &mut RunSpec, args: &TrainArgs) {
    if let Some(epochs) = args.epochs {
        spec.training.epochs = epochs;
    }
    if let Some(log_every) = args.log_every {
        spec.training.log_every = log_every;
    }
    if let Some(device) = args.device {
        spec.training.device = device;
    }
    if let Some(output_dir) = &args.output_dir {
        spec.training.output_dir = output_dir.clone();
    }
}

/// Render a spec for the info command
pub fn render_info(spec: &RunSpec, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(spec)
            .map_err(|e| Error::Serialization(e.to_string())),
        OutputFormat::Yaml => {
            serde_yaml::to_string(spec).map_err(|e| Error::Serialization(e.to_string()))
        }
        OutputFormat::Text => {
            let data = match (&spec.data.train, &spec.data.blobs) {
                (Some(path), _) => path.display().to_string(),
                (None, Some(b)) => format!(
                    "blobs ({} examples, {} classes, {} features)",
                    b.examples, b.classes, b.features
                ),
                (None, None) => "none".to_string(),
            };
            let mut lines = vec![
                format!("Model: {} (hidden={}, dropout={})", spec.model.arch, spec.model.hidden, spec.model.dropout),
                format!("Data: {data}"),
                format!("Batch size: {}", spec.data.batch_size),
                format!("Validation: {}", if spec.has_validation() { "yes" } else { "no" }),
                format!("Optimizer: {} (lr={})", spec.optimizer.name, spec.optimizer.lr),
                format!("Loss: {}", spec.loss.name),
                format!("Epochs: {}", spec.training.epochs),
                format!("Log every: {} of an epoch", spec.training.log_every),
                format!("Device: {:?}", spec.training.device),
                format!("Output dir: {}", spec.training.output_dir.display()),
            ];
            if let (Some(ckpt), Some(monitor)) = (&spec.checkpoint, spec.monitor_key()) {
                lines.push(format!(
                    "Checkpoint: monitor={monitor} mode={:?} patience={}",
                    ckpt.mode,
                    ckpt.patience.map_or("none".to_string(), |p| p.to_string())
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_command() {
        let cli = parse_args(["entrenar-fit", "train", "config.yaml"]).unwrap();
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert!(args.epochs.is_none());
                assert!(args.device.is_none());
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_parse_train_with_overrides() {
        let cli = parse_args([
            "entrenar-fit",
            "train",
            "config.yaml",
            "--epochs",
            "10",
            "--log-every",
            "0.5",
            "--device",
            "cpu",
            "--output-dir",
            "./output",
        ])
        .unwrap();

        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.epochs, Some(10));
                assert_eq!(args.log_every, Some(0.5));
                assert_eq!(args.device, Some(DeviceSelector::Cpu));
                assert_eq!(args.output_dir, Some(PathBuf::from("./output")));
            }
            _ => panic!("Expected Train command"),
        }
    }

    #[test]
    fn test_parse_invalid_device() {
        assert!(parse_args(["entrenar-fit", "train", "c.yaml", "--device", "tpu"]).is_err());
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = parse_args(["entrenar-fit", "validate", "config.yaml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert!(matches!(cli.command, Command::Validate(_)));
    }

    #[test]
    fn test_parse_info_json_format() {
        let cli = parse_args(["entrenar-fit", "info", "config.yaml", "--format", "json"]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("Expected Info command"),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    fn spec() -> RunSpec {
        serde_yaml::from_str(
            r#"
model: { arch: mlp }
data: { blobs: { examples: 10, classes: 2, features: 2 }, batch_size: 4, val_split: 0.2 }
optimizer: { name: sgd, lr: 0.1 }
checkpoint: { patience: 3 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_apply_overrides() {
        let mut spec = spec();
        let args = TrainArgs {
            config: PathBuf::from("c.yaml"),
            epochs: Some(2),
            log_every: Some(0.5),
            device: Some(DeviceSelector::Cpu),
            output_dir: Some(PathBuf::from("out")),
        };
        apply_overrides(&mut spec, &args);
        assert_eq!(spec.training.epochs, 2);
        assert_eq!(spec.training.log_every, 0.5);
        assert_eq!(spec.training.device, DeviceSelector::Cpu);
        assert_eq!(spec.training.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_render_info() {
        let spec = spec();
        let text = render_info(&spec, OutputFormat::Text).unwrap();
        assert!(text.contains("Model: mlp"));
        assert!(text.contains("Validation: yes"));
        assert!(text.contains("monitor=val_loss"));

        let json = render_info(&spec, OutputFormat::Json).unwrap();
        let back: RunSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
