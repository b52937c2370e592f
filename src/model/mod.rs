//! Model collaborator interface
//!
//! The training loop treats a model as an opaque parameter container with a
//! train/eval switch. Differentiation is delegated to [`value_and_grad`],
//! which runs a scalar-producing closure on the autograd tape and returns the
//! gradient of every trainable parameter.

mod linear;
mod mlp;
mod weights;

pub use linear::Linear;
pub use mlp::Mlp;
pub use weights::{get_weights, load_weights, WeightTensor, Weights};

use crate::autograd::{backward, Tensor};
use crate::device::Device;
use crate::error::{Error, Result};
use ndarray::Array1;

/// Forward-pass behavior switch (dropout, normalization statistics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// A trainable model
///
/// `named_parameters` and `named_parameters_mut` must list parameters in the
/// same order; gradients and optimizer state are aligned by position.
pub trait Model {
    /// Raw predictions (logits) for a `[batch, features]` input
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor>;

    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)>;

    /// Force any deferred computation on the parameters.
    ///
    /// Eager models have nothing pending.
    fn materialize(&self, _device: &Device) -> Result<()> {
        Ok(())
    }

    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.len()).sum()
    }
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        (**self).forward(inputs)
    }

    fn set_mode(&mut self, mode: Mode) {
        (**self).set_mode(mode)
    }

    fn mode(&self) -> Mode {
        (**self).mode()
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        (**self).named_parameters()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        (**self).named_parameters_mut()
    }

    fn materialize(&self, device: &Device) -> Result<()> {
        (**self).materialize(device)
    }
}

/// Per-parameter gradients, aligned with [`Model::named_parameters`]
#[derive(Debug, Clone, Default)]
pub struct Gradients {
    grads: Vec<Option<Array1<f32>>>,
}

impl Gradients {
    pub fn new(grads: Vec<Option<Array1<f32>>>) -> Self {
        Self { grads }
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Array1<f32>> {
        self.grads.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Array1<f32>>> {
        self.grads.iter().map(Option::as_ref)
    }

    /// L2 norm over all gradients
    pub fn global_norm(&self) -> f32 {
        self.iter()
            .flatten()
            .map(|g| g.iter().map(|v| v * v).sum::<f32>())
            .sum::<f32>()
            .sqrt()
    }
}

/// Evaluate `f` on the model and differentiate its scalar output.
///
/// `f` returns the scalar loss tensor plus an auxiliary value that is passed
/// through untouched (typically the predictions). Parameter gradients are
/// cleared before `f` runs, so nothing leaks in from a previous step.
pub fn value_and_grad<M, F, A>(model: &mut M, f: F) -> Result<(f32, A, Gradients)>
where
    M: Model + ?Sized,
    F: FnOnce(&mut M) -> Result<(Tensor, A)>,
{
    for (_, param) in model.named_parameters() {
        param.zero_grad();
    }

    let (mut loss, aux) = f(model)?;
    if loss.len() != 1 {
        return Err(Error::ShapeMismatch {
            expected: vec![1],
            got: loss.shape().to_vec(),
        });
    }
    let value = loss.data()[0];

    backward(&mut loss, None);

    let grads = model
        .named_parameters()
        .into_iter()
        .map(|(_, p)| p.grad())
        .collect();

    Ok((value, aux, Gradients::new(grads)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::mean;

    fn model() -> Linear {
        Linear::from_parts(
            Tensor::matrix(2, 1, vec![1.0, -1.0], true).unwrap(),
            Tensor::from_vec(vec![0.5], true),
            Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn test_value_and_grad_returns_aux_and_grads() {
        let mut m = model();
        let x = Tensor::matrix(1, 2, vec![2.0, 3.0], false).unwrap();

        let (value, preds, grads) = value_and_grad(&mut m, |m| {
            let preds = m.forward(&x)?;
            Ok((mean(&preds), preds.detach()))
        })
        .unwrap();

        // 2 - 3 + 0.5
        assert!((value + 0.5).abs() < 1e-6);
        assert_eq!(preds.data().to_vec(), vec![-0.5]);
        assert_eq!(grads.len(), 2);
        assert_eq!(grads.get(0).unwrap().to_vec(), vec![2.0, 3.0]);
        assert_eq!(grads.get(1).unwrap().to_vec(), vec![1.0]);
    }

    #[test]
    fn test_value_and_grad_clears_previous_gradients() {
        let mut m = model();
        let x = Tensor::matrix(1, 2, vec![1.0, 1.0], false).unwrap();
        let run = |m: &mut Linear| {
            value_and_grad(m, |m| Ok((mean(&m.forward(&x)?), ())))
                .unwrap()
                .2
        };
        let first = run(&mut m);
        let second = run(&mut m);
        assert_eq!(first.get(0), second.get(0));
    }

    #[test]
    fn test_value_and_grad_rejects_non_scalar() {
        let mut m = model();
        let x = Tensor::matrix(2, 2, vec![1.0; 4], false).unwrap();
        let err = value_and_grad(&mut m, |m| Ok((m.forward(&x)?, ()))).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_global_norm() {
        let grads = Gradients::new(vec![
            Some(ndarray::arr1(&[3.0])),
            None,
            Some(ndarray::arr1(&[4.0])),
        ]);
        assert!((grads.global_norm() - 5.0).abs() < 1e-6);
    }
}
