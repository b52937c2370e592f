//! Running metrics for training and validation phases
//!
//! Accumulators are stateful: the trainer feeds every batch through
//! [`MetricAccumulator::update`], reads [`MetricAccumulator::compute`] once
//! when the phase ends and resets before the next phase starts.

use crate::autograd::Tensor;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Metric name to value, as handed to the checkpoint policy
pub type MetricMap = BTreeMap<String, f64>;

/// Trait for running metrics
pub trait MetricAccumulator {
    /// Fold one batch of raw predictions into the running state
    fn update(&mut self, predictions: &Tensor, targets: &Tensor) -> Result<()>;

    /// Value over everything seen since the last reset
    fn compute(&self) -> f64;

    fn reset(&mut self);

    fn name(&self) -> &str;
}

/// Classification accuracy over raw logits
///
/// Multi-column predictions use argmax against a class-index target, or
/// against the argmax of a `[batch, classes]` target row (one-hot labels,
/// soft labels, multi-output regression targets). Single-column predictions
/// are a binary logit: class 1 when the logit is at or above `threshold`.
///
/// # Example
///
/// ```
/// use entrenar_fit::train::{Accuracy, MetricAccumulator};
/// use entrenar_fit::Tensor;
///
/// let mut acc = Accuracy::default();
/// let logits = Tensor::matrix(2, 2, vec![2.0, 0.1, 0.3, 0.9], false).unwrap();
/// let targets = Tensor::from_vec(vec![0.0, 0.0], false);
///
/// acc.update(&logits, &targets).unwrap();
/// assert_eq!(acc.compute(), 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Accuracy {
    threshold: f32,
    correct: usize,
    total: usize,
}

impl Accuracy {
    /// Accuracy with a custom logit threshold for single-output models
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn predicted_class(&self, row: &[f32]) -> usize {
        if row.len() == 1 {
            return usize::from(row[0] >= self.threshold);
        }
        argmax(row)
    }
}

fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0
}

impl MetricAccumulator for Accuracy {
    fn update(&mut self, predictions: &Tensor, targets: &Tensor) -> Result<()> {
        let rows = predictions.rows();
        let width = predictions.row_len().max(1);
        let data = predictions.data();

        if targets.len() == rows {
            for (r, &target) in targets.data().iter().enumerate() {
                let row = data.slice(ndarray::s![r * width..(r + 1) * width]).to_vec();
                if self.predicted_class(&row) as f32 == target {
                    self.correct += 1;
                }
            }
        } else if targets.rows() == rows && targets.len() == predictions.len() {
            // One-hot or soft targets: compare the argmax of each row
            let labels = targets.data();
            for r in 0..rows {
                let span = r * width..(r + 1) * width;
                let predicted = argmax(&data.slice(ndarray::s![span.clone()]).to_vec());
                let expected = argmax(&labels.slice(ndarray::s![span]).to_vec());
                if predicted == expected {
                    self.correct += 1;
                }
            }
        } else {
            return Err(Error::ShapeMismatch {
                expected: vec![rows],
                got: targets.shape().to_vec(),
            });
        }
        self.total += rows;
        Ok(())
    }

    /// Fraction correct; zero before any example was seen
    fn compute(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    fn reset(&mut self) {
        self.correct = 0;
        self.total = 0;
    }

    fn name(&self) -> &str {
        "accuracy"
    }
}

/// Which half of an epoch produced a set of metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Train,
    Val,
}

impl Phase {
    pub fn prefix(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
        }
    }

    pub fn loss_key(self) -> String {
        format!("{}_loss", self.prefix())
    }

    pub fn acc_key(self) -> String {
        format!("{}_acc", self.prefix())
    }
}

/// Aggregates of one phase of one epoch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub mean_loss: f64,
    pub accuracy: f64,
    /// Examples per second
    pub mean_throughput: f64,
}

impl EpochMetrics {
    /// Keys `{prefix}_loss` and `{prefix}_acc`
    pub fn to_map(&self, phase: Phase) -> MetricMap {
        MetricMap::from([
            (phase.loss_key(), self.mean_loss),
            (phase.acc_key(), self.accuracy),
        ])
    }
}

/// Examples per second for one batch
///
/// A zero-sized batch has no defined throughput. Elapsed times below one
/// nanosecond are floored so the result stays finite.
pub fn throughput(batch_size: usize, elapsed: Duration) -> Result<f64> {
    if batch_size == 0 {
        return Err(Error::DegenerateThroughput { batch_size });
    }
    let secs = elapsed.max(Duration::from_nanos(1)).as_secs_f64();
    Ok(batch_size as f64 / secs)
}

/// Arithmetic mean; zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
