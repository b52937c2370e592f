//! Optimizer trait

use crate::device::Device;
use crate::error::{Error, Result};
use crate::model::{Gradients, Model};
use std::collections::BTreeMap;

/// Key under which every optimizer reports its current learning rate
pub const LEARNING_RATE: &str = "learning_rate";

/// Read-out of an optimizer's scalar state, always holding [`LEARNING_RATE`]
pub type OptimizerState = BTreeMap<String, f32>;

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Apply one update to the model's parameters in place
    fn update(&mut self, model: &mut dyn Model, grads: &Gradients) -> Result<()>;

    fn lr(&self) -> f32;

    fn set_lr(&mut self, lr: f32);

    fn state(&self) -> OptimizerState {
        OptimizerState::from([(LEARNING_RATE.to_string(), self.lr())])
    }

    /// Force any deferred computation on internal buffers.
    ///
    /// Eager optimizers have nothing pending.
    fn materialize(&self, _device: &Device) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Gradients must line up one-to-one with the model's parameters.
pub(crate) fn check_alignment(model: &dyn Model, grads: &Gradients) -> Result<()> {
    let params = model.named_parameters();
    if params.len() != grads.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![params.len()],
            got: vec![grads.len()],
        });
    }
    for ((_, param), grad) in params.iter().zip(grads.iter()) {
        if let Some(grad) = grad {
            if grad.len() != param.len() {
                return Err(Error::ShapeMismatch {
                    expected: param.shape().to_vec(),
                    got: vec![grad.len()],
                });
            }
        }
    }
    Ok(())
}
