//! Loss functions for training
//!
//! Losses are per-example: `forward` returns one value per batch row and the
//! trainer reduces them. The returned tensor carries a backward op that feeds
//! the predictions' gradient and continues down the tape.

use crate::autograd::{BackwardOp, GradCell, Tensor};
use crate::error::{Error, Result};
use ndarray::Array1;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Extra keyword parameters forwarded to every loss call
pub type LossParams = BTreeMap<String, f32>;

pub const LABEL_SMOOTHING: &str = "label_smoothing";

/// Trait for loss functions
pub trait LossFn {
    /// Per-example losses for `predictions` against `targets`
    fn forward(&self, predictions: &Tensor, targets: &Tensor, params: &LossParams)
        -> Result<Tensor>;

    /// Name of the loss function
    fn name(&self) -> &str;
}

fn reject_unknown(params: &LossParams, allowed: &[&str], loss: &str) -> Result<()> {
    match params.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(Error::InvalidParameter(format!(
            "{loss} does not accept parameter '{key}'"
        ))),
        None => Ok(()),
    }
}

/// Wrap per-example values in a tensor whose backward scales `local` (the
/// derivative of each row's loss w.r.t. that row's predictions) by the
/// incoming per-row gradient.
fn per_example(values: Vec<f32>, predictions: &Tensor, local: Array1<f32>) -> Tensor {
    let mut losses = Tensor::from_vec(values, predictions.requires_grad());
    if predictions.requires_grad() {
        losses.set_backward_op(Rc::new(PerExampleBackward {
            predictions: predictions.clone(),
            local,
            row_len: predictions.row_len().max(1),
            result_grad: losses.grad_cell(),
        }));
    }
    losses
}

struct PerExampleBackward {
    predictions: Tensor,
    local: Array1<f32>,
    row_len: usize,
    result_grad: GradCell,
}

impl BackwardOp for PerExampleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            let scaled =
                Array1::from_shape_fn(self.local.len(), |i| self.local[i] * grad[i / self.row_len]);
            self.predictions.accumulate_grad(scaled);
            if let Some(op) = self.predictions.backward_op() {
                op.backward();
            }
        }
    }
}

/// Mean Squared Error Loss
///
/// Per row: `mean_j((pred_j - target_j)²)`. Single-column predictions may be
/// paired with a flat `[batch]` target.
///
/// # Example
///
/// ```
/// use entrenar_fit::train::{LossFn, LossParams, MseLoss};
/// use entrenar_fit::Tensor;
///
/// let pred = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
/// let target = Tensor::from_vec(vec![1.5, 2.5, 3.5], false);
///
/// let losses = MseLoss.forward(&pred, &target, &LossParams::new()).unwrap();
/// assert_eq!(losses.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl LossFn for MseLoss {
    fn forward(
        &self,
        predictions: &Tensor,
        targets: &Tensor,
        params: &LossParams,
    ) -> Result<Tensor> {
        reject_unknown(params, &[], self.name())?;
        if predictions.len() != targets.len() || predictions.rows() != targets.rows() {
            return Err(Error::ShapeMismatch {
                expected: predictions.shape().to_vec(),
                got: targets.shape().to_vec(),
            });
        }

        let width = predictions.row_len().max(1);
        let diff = predictions.data() - targets.data();
        let values = (0..predictions.rows())
            .map(|r| {
                let row = diff.slice(ndarray::s![r * width..(r + 1) * width]);
                row.mapv(|d| d * d).sum() / width as f32
            })
            .collect();

        // d/dpred = 2 (pred - target) / width
        let local = diff * (2.0 / width as f32);
        Ok(per_example(values, predictions, local))
    }

    fn name(&self) -> &str {
        "mse"
    }
}

/// Cross Entropy Loss over logits with class-index targets
///
/// Predictions are `[batch, classes]`, targets hold one class index per row.
/// The optional `label_smoothing` parameter mixes the one-hot target with a
/// uniform distribution.
///
/// # Example
///
/// ```
/// use entrenar_fit::train::{CrossEntropyLoss, LossFn, LossParams};
/// use entrenar_fit::Tensor;
///
/// let logits = Tensor::matrix(1, 3, vec![2.0, 1.0, 0.5], true).unwrap();
/// let targets = Tensor::from_vec(vec![0.0], false);
///
/// let losses = CrossEntropyLoss.forward(&logits, &targets, &LossParams::new()).unwrap();
/// assert!(losses.data()[0] > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Numerically stable softmax of one row
    fn softmax(logits: &[f32]) -> Vec<f32> {
        let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(
        &self,
        predictions: &Tensor,
        targets: &Tensor,
        params: &LossParams,
    ) -> Result<Tensor> {
        reject_unknown(params, &[LABEL_SMOOTHING], self.name())?;
        let smoothing = params.get(LABEL_SMOOTHING).copied().unwrap_or(0.0);
        if !(0.0..1.0).contains(&smoothing) {
            return Err(Error::InvalidParameter(format!(
                "{LABEL_SMOOTHING} must be in [0, 1), got {smoothing}"
            )));
        }

        let (rows, classes) = (predictions.rows(), predictions.row_len());
        if predictions.shape().len() != 2 || classes < 2 {
            return Err(Error::InvalidParameter(format!(
                "cross entropy needs [batch, classes >= 2] logits, got {:?}",
                predictions.shape()
            )));
        }
        if targets.len() != rows {
            return Err(Error::ShapeMismatch {
                expected: vec![rows],
                got: targets.shape().to_vec(),
            });
        }

        let logits = predictions.data();
        let uniform = smoothing / classes as f32;
        let mut values = Vec::with_capacity(rows);
        let mut local = Array1::zeros(rows * classes);

        for (r, &target) in targets.data().iter().enumerate() {
            let label = target as usize;
            if target < 0.0 || target.fract() != 0.0 || label >= classes {
                return Err(Error::InvalidParameter(format!(
                    "target {target} is not a class index below {classes}"
                )));
            }

            let row = logits.slice(ndarray::s![r * classes..(r + 1) * classes]).to_vec();
            let probs = Self::softmax(&row);
            let mut loss = 0.0;
            for (j, &p) in probs.iter().enumerate() {
                let weight = uniform + if j == label { 1.0 - smoothing } else { 0.0 };
                loss -= weight * (p + 1e-10).ln();
                // d/dlogit = softmax - smoothed one-hot
                local[r * classes + j] = p - weight;
            }
            values.push(loss);
        }

        Ok(per_example(values, predictions, local))
    }

    fn name(&self) -> &str {
        "cross_entropy"
    }
}
