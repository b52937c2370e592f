//! Data sources
//!
//! A [`DataSource`] is a finite, restartable sequence of batches. The trainer
//! asks for a fresh pass every epoch; any reshuffling happens inside the
//! source.

use super::Batch;
use crate::autograd::Tensor;
use crate::device::Device;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Batch producer consumed by the trainer
pub trait DataSource {
    /// Number of batches in one pass
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new pass, placing every batch on `device`
    fn batches<'a>(&'a mut self, device: &Device)
        -> Box<dyn Iterator<Item = Result<Batch>> + 'a>;
}

/// Row-major examples held in memory and cut into fixed-size batches
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    features: Vec<f32>,
    targets: Vec<f32>,
    num_features: usize,
    target_width: usize,
    batch_size: usize,
    drop_last: bool,
    shuffle: Option<StdRng>,
}

/// On-disk JSON layout: one input row and one target per example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    pub inputs: Vec<Vec<f32>>,
    pub targets: DatasetTargets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetTargets {
    /// Class index or scalar regression target per example
    Scalars(Vec<f32>),
    Rows(Vec<Vec<f32>>),
}

/// Parameters for [`InMemoryDataset::blobs`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobsSpec {
    pub examples: usize,
    pub classes: usize,
    pub features: usize,
    /// Half-width of the noise box around each class center
    #[serde(default = "default_spread")]
    pub spread: f32,
    #[serde(default)]
    pub seed: u64,
}

fn default_spread() -> f32 {
    1.0
}

impl InMemoryDataset {
    pub fn new(
        features: Vec<f32>,
        num_features: usize,
        targets: Vec<f32>,
        target_width: usize,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::ConfigError("batch_size must be > 0".to_string()));
        }
        if num_features == 0 || target_width == 0 {
            return Err(Error::Data(
                "feature and target widths must be non-zero".to_string(),
            ));
        }
        if features.len() % num_features != 0 || targets.len() % target_width != 0 {
            return Err(Error::Data(format!(
                "{} feature values do not split into rows of {num_features}",
                features.len()
            )));
        }
        let rows = features.len() / num_features;
        if targets.len() / target_width != rows {
            return Err(Error::ShapeMismatch {
                expected: vec![rows, target_width],
                got: vec![targets.len() / target_width, target_width],
            });
        }

        Ok(Self {
            features,
            targets,
            num_features,
            target_width,
            batch_size,
            drop_last: false,
            shuffle: None,
        })
    }

    /// Reshuffle example order at the start of every pass
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Drop a trailing partial batch
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn num_examples(&self) -> usize {
        self.features.len() / self.num_features
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn target_width(&self) -> usize {
        self.target_width
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Largest target value + 1, assuming class-index targets
    pub fn num_classes(&self) -> usize {
        self.targets
            .iter()
            .fold(0.0f32, |acc, &t| acc.max(t))
            .max(0.0) as usize
            + 1
    }

    /// Load a [`DatasetFile`] from JSON
    pub fn from_json(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Data(format!("failed to read {}: {e}", path.display())))?;
        let file: DatasetFile = serde_json::from_str(&raw)
            .map_err(|e| Error::Data(format!("failed to parse {}: {e}", path.display())))?;
        Self::from_file(file, batch_size)
    }

    pub fn from_file(file: DatasetFile, batch_size: usize) -> Result<Self> {
        let num_features = file.inputs.first().map(Vec::len).unwrap_or(0);
        if file.inputs.iter().any(|row| row.len() != num_features) {
            return Err(Error::Data("input rows have different widths".to_string()));
        }
        let (targets, target_width) = match file.targets {
            DatasetTargets::Scalars(t) => (t, 1),
            DatasetTargets::Rows(rows) => {
                let width = rows.first().map(Vec::len).unwrap_or(0);
                if rows.iter().any(|row| row.len() != width) {
                    return Err(Error::Data("target rows have different widths".to_string()));
                }
                (rows.into_iter().flatten().collect(), width)
            }
        };
        let features = file.inputs.into_iter().flatten().collect();
        Self::new(features, num_features, targets, target_width, batch_size)
    }

    /// Synthetic classification data: one uniform noise box per class center
    pub fn blobs(spec: &BlobsSpec, batch_size: usize) -> Result<Self> {
        if spec.classes == 0 || spec.features == 0 || spec.examples == 0 {
            return Err(Error::ConfigError(
                "blobs need at least one example, class and feature".to_string(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let centers: Vec<f32> = (0..spec.classes * spec.features)
            .map(|_| rng.random_range(-5.0..5.0))
            .collect();

        let spread = spec.spread.abs().max(f32::EPSILON);
        let mut features = Vec::with_capacity(spec.examples * spec.features);
        let mut targets = Vec::with_capacity(spec.examples);
        for _ in 0..spec.examples {
            let class = rng.random_range(0..spec.classes);
            let center = &centers[class * spec.features..(class + 1) * spec.features];
            features.extend(center.iter().map(|c| c + rng.random_range(-spread..spread)));
            targets.push(class as f32);
        }

        Self::new(features, spec.features, targets, 1, batch_size)
    }

    /// Move the first `fraction` of examples into a second dataset
    ///
    /// Both halves keep the batch size; shuffling is not carried over.
    pub fn split(self, fraction: f32) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(Error::ConfigError(format!(
                "split fraction must be in [0, 1), got {fraction}"
            )));
        }
        let held_out = (self.num_examples() as f32 * fraction).round() as usize;
        let (f_cut, t_cut) = (held_out * self.num_features, held_out * self.target_width);

        let head = Self::new(
            self.features[..f_cut].to_vec(),
            self.num_features,
            self.targets[..t_cut].to_vec(),
            self.target_width,
            self.batch_size,
        )?;
        let tail = Self::new(
            self.features[f_cut..].to_vec(),
            self.num_features,
            self.targets[t_cut..].to_vec(),
            self.target_width,
            self.batch_size,
        )?;
        Ok((tail, head))
    }

    fn epoch_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.num_examples()).collect();
        if let Some(rng) = self.shuffle.as_mut() {
            order.shuffle(rng);
        }
        order
    }

    fn gather(&self, rows: &[usize]) -> Result<Batch> {
        let (nf, tw) = (self.num_features, self.target_width);
        let mut inputs = Vec::with_capacity(rows.len() * nf);
        let mut targets = Vec::with_capacity(rows.len() * tw);
        for &r in rows {
            inputs.extend_from_slice(&self.features[r * nf..(r + 1) * nf]);
            targets.extend_from_slice(&self.targets[r * tw..(r + 1) * tw]);
        }

        let inputs = Tensor::matrix(rows.len(), nf, inputs, false)?;
        let targets = if tw == 1 {
            Tensor::from_vec(targets, false)
        } else {
            Tensor::matrix(rows.len(), tw, targets, false)?
        };
        Batch::new(inputs, targets)
    }
}

impl DataSource for InMemoryDataset {
    fn len(&self) -> usize {
        let n = self.num_examples();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    fn batches<'a>(
        &'a mut self,
        device: &Device,
    ) -> Box<dyn Iterator<Item = Result<Batch>> + 'a> {
        if device.is_accelerator() {
            let err = Error::Data(format!("in-memory dataset cannot be placed on {device}"));
            return Box::new(std::iter::once(Err(err)));
        }

        let order = self.epoch_order();
        let batch_count = self.len();
        let this: &'a Self = self;
        Box::new((0..batch_count).map(move |b| {
            let start = b * this.batch_size;
            let end = (start + this.batch_size).min(order.len());
            this.gather(&order[start..end])
        }))
    }
}
