//! Adam optimizer

use super::optimizer::{check_alignment, OptimizerState, LEARNING_RATE};
use super::Optimizer;
use crate::error::Result;
use crate::model::{Gradients, Model};
use ndarray::Array1;

/// Adam optimizer (Adaptive Moment Estimation)
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl Adam {
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    pub fn steps(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, model: &mut dyn Model, grads: &Gradients) -> Result<()> {
        check_alignment(model, grads)?;
        if self.m.len() != grads.len() {
            self.m = vec![None; grads.len()];
            self.v = vec![None; grads.len()];
        }
        self.t += 1;

        // Bias correction folded into the step size
        let t = self.t as i32;
        let lr_t = self.lr * ((1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t)));

        for (i, ((_, param), grad)) in model
            .named_parameters_mut()
            .into_iter()
            .zip(grads.iter())
            .enumerate()
        {
            let Some(grad) = grad else { continue };

            // m_t = β1 * m_{t-1} + (1 - β1) * g
            let m_t = match &self.m[i] {
                Some(m) => m * self.beta1 + grad * (1.0 - self.beta1),
                None => grad * (1.0 - self.beta1),
            };

            // v_t = β2 * v_{t-1} + (1 - β2) * g²
            let grad_sq = grad * grad;
            let v_t = match &self.v[i] {
                Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                None => &grad_sq * (1.0 - self.beta2),
            };

            // θ_t = θ_{t-1} - lr_t * m_t / (√v_t + ε)
            let step = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
            *param.data_mut() -= &step;

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
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
            ("beta1".to_string(), self.beta1),
            ("beta2".to_string(), self.beta2),
            ("step".to_string(), self.t as f32),
        ])
    }

    fn name(&self) -> &str {
        "adam"
    }
}
