//! # entrenar-fit: Supervised Training Loop
//!
//! entrenar-fit drives gradient-based training of a model over a dataset. It
//! tracks loss, accuracy and throughput per epoch, optionally runs a
//! validation pass, and delegates checkpointing and early stopping to a
//! pluggable policy.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation
//! - **device**: Compute device selection and the synchronization barrier
//! - **model**: Model trait, `value_and_grad`, weight snapshots, reference models
//! - **optim**: Optimizers (SGD, Adam)
//! - **train**: Data sources, losses, metrics, checkpointing and the `Trainer`
//! - **config**: Declarative YAML configuration and CLI definitions

pub mod autograd;
pub mod config;
pub mod device;
pub mod model;
pub mod optim;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
pub use train::{RunOutcome, TrainReport, Trainer};
