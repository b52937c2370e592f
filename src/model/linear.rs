//! Fully connected layer

use super::{Mode, Model};
use crate::autograd::{add_bias, matmul, Tensor};
use crate::device::Device;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `y = x @ W + b` with `W: [in_features, out_features]`
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Tensor,
    bias: Tensor,
    device: Device,
    mode: Mode,
}

impl Linear {
    /// Uniform init in `±1/sqrt(in_features)`, deterministic for a given seed
    pub fn new(in_features: usize, out_features: usize, device: &Device, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(in_features, out_features, device, &mut rng)
    }

    pub(crate) fn with_rng<R: Rng>(
        in_features: usize,
        out_features: usize,
        device: &Device,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidParameter(format!(
                "linear layer needs non-zero dimensions, got {in_features}x{out_features}"
            )));
        }
        let bound = 1.0 / (in_features as f32).sqrt();
        let weight: Vec<f32> = (0..in_features * out_features)
            .map(|_| rng.random_range(-bound..bound))
            .collect();
        let bias: Vec<f32> = (0..out_features)
            .map(|_| rng.random_range(-bound..bound))
            .collect();

        Self::from_parts(
            Tensor::matrix(in_features, out_features, weight, true)?,
            Tensor::from_vec(bias, true),
            *device,
        )
    }

    /// Build from explicit tensors (`weight` must be 2-D)
    pub fn from_parts(weight: Tensor, bias: Tensor, device: Device) -> Result<Self> {
        match weight.shape() {
            [_, out] if *out == bias.len() => Ok(Self {
                weight,
                bias,
                device,
                mode: Mode::Train,
            }),
            _ => Err(Error::ShapeMismatch {
                expected: vec![weight.rows(), bias.len()],
                got: weight.shape().to_vec(),
            }),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.rows()
    }

    pub fn out_features(&self) -> usize {
        self.bias.len()
    }
}

impl Model for Linear {
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        add_bias(&matmul(inputs, &self.weight)?, &self.bias)
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![
            ("weight".to_string(), &self.weight),
            ("bias".to_string(), &self.bias),
        ]
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        vec![
            ("weight".to_string(), &mut self.weight),
            ("bias".to_string(), &mut self.bias),
        ]
    }

    fn materialize(&self, device: &Device) -> Result<()> {
        if *device != self.device {
            return Err(Error::ConfigError(format!(
                "model lives on {} but was synchronized on {device}",
                self.device
            )));
        }
        Ok(())
    }
}
