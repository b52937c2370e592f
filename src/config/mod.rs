//! Declarative YAML configuration
//!
//! A run is described by one YAML document:
//!
//! ```yaml
//! model:
//!   arch: mlp
//!   hidden: 32
//!   dropout: 0.1
//!
//! data:
//!   blobs: { examples: 1000, classes: 3, features: 2 }
//!   val_split: 0.2
//!   batch_size: 32
//!   shuffle: true
//!
//! optimizer:
//!   name: adam
//!   lr: 1e-3
//!
//! loss:
//!   name: cross_entropy
//!   params: { label_smoothing: 0.1 }
//!
//! training:
//!   epochs: 10
//!   log_every: 0.1
//!
//! checkpoint:
//!   monitor: val_loss
//!   patience: 3
//! ```

mod builder;
mod cli;
mod schema;
mod train;
mod validate;

pub use builder::{
    build_checkpoint, build_data, build_loss, build_model, build_optimizer, infer_outputs,
    trainer_config,
};
pub use cli::{
    apply_overrides, parse_args, render_info, Cli, Command, InfoArgs, OutputFormat, TrainArgs,
    ValidateArgs,
};
pub use schema::{
    CheckpointSpec, DataSpec, LossSpec, ModelSpec, OptimSpec, RunSpec, TrainingParams,
};
pub use train::{load_config, parse_config, train_from_spec, train_from_yaml, FINAL_WEIGHTS};
pub use validate::{validate_spec, ValidationError};
