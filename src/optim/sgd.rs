//! Stochastic Gradient Descent optimizer

use super::optimizer::{check_alignment, OptimizerState, LEARNING_RATE};
use super::Optimizer;
use crate::error::Result;
use crate::model::{Gradients, Model};
use ndarray::Array1;

/// SGD optimizer with optional momentum
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<Array1<f32>>>,
}

impl Sgd {
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, model: &mut dyn Model, grads: &Gradients) -> Result<()> {
        check_alignment(model, grads)?;
        if self.velocities.len() != grads.len() {
            self.velocities = vec![None; grads.len()];
        }

        for (i, ((_, param), grad)) in model
            .named_parameters_mut()
            .into_iter()
            .zip(grads.iter())
            .enumerate()
        {
            let Some(grad) = grad else { continue };

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                let velocity = match &self.velocities[i] {
                    Some(v) => v * self.momentum - grad * self.lr,
                    None => grad * (-self.lr),
                };
                *param.data_mut() += &velocity;
                self.velocities[i] = Some(velocity);
            } else {
                *param.data_mut() -= &(grad * self.lr);
            }
        }
        Ok(())
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::from([
            (LEARNING_RATE.to_string(), self.lr),
            ("momentum".to_string(), self.momentum),
        ])
    }

    fn name(&self) -> &str {
        "sgd"
    }
}
