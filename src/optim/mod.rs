//! Optimizers for training neural networks

mod adam;
mod optimizer;
mod sgd;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerState, LEARNING_RATE};
pub use sgd::Sgd;
