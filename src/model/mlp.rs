//! Two-layer perceptron with dropout

use super::{Linear, Mode, Model};
use crate::autograd::{mul, relu, Tensor};
use crate::device::Device;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `fc2(dropout(relu(fc1(x))))`
///
/// Dropout is inverted (kept units are scaled by `1 / (1 - p)`) and only
/// active in [`Mode::Train`].
#[derive(Debug, Clone)]
pub struct Mlp {
    fc1: Linear,
    fc2: Linear,
    dropout: f32,
    rng: StdRng,
    mode: Mode,
}

impl Mlp {
    pub fn new(
        in_features: usize,
        hidden: usize,
        out_features: usize,
        dropout: f32,
        device: &Device,
        seed: u64,
    ) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::InvalidParameter(format!(
                "dropout must be in [0, 1), got {dropout}"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let fc1 = Linear::with_rng(in_features, hidden, device, &mut rng)?;
        let fc2 = Linear::with_rng(hidden, out_features, device, &mut rng)?;
        Ok(Self {
            fc1,
            fc2,
            dropout,
            rng,
            mode: Mode::Train,
        })
    }

    fn dropout_mask(&mut self, like: &Tensor) -> Result<Tensor> {
        let keep = 1.0 - self.dropout;
        let mask: Vec<f32> = (0..like.len())
            .map(|_| {
                if self.rng.random::<f32>() < keep {
                    1.0 / keep
                } else {
                    0.0
                }
            })
            .collect();
        Tensor::with_shape(mask, like.shape(), false)
    }
}

impl Model for Mlp {
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        let mut hidden = relu(&self.fc1.forward(inputs)?);
        if self.mode == Mode::Train && self.dropout > 0.0 {
            let mask = self.dropout_mask(&hidden)?;
            hidden = mul(&hidden, &mask)?;
        }
        self.fc2.forward(&hidden)
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.fc1.set_mode(mode);
        self.fc2.set_mode(mode);
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let fc1 = self.fc1.named_parameters().into_iter().map(|(n, p)| (format!("fc1.{n}"), p));
        let fc2 = self.fc2.named_parameters().into_iter().map(|(n, p)| (format!("fc2.{n}"), p));
        fc1.chain(fc2).collect()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        let fc1 = self
            .fc1
            .named_parameters_mut()
            .into_iter()
            .map(|(n, p)| (format!("fc1.{n}"), p));
        let fc2 = self
            .fc2
            .named_parameters_mut()
            .into_iter()
            .map(|(n, p)| (format!("fc2.{n}"), p));
        fc1.chain(fc2).collect()
    }

    fn materialize(&self, device: &Device) -> Result<()> {
        self.fc1.materialize(device)?;
        self.fc2.materialize(device)
    }
}
