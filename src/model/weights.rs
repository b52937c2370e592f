//! Serializable weight snapshots

use super::Model;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One named parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Snapshot of every trainable parameter, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub tensors: BTreeMap<String, WeightTensor>,
}

impl Weights {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&WeightTensor> {
        self.tensors.get(name)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string(self)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))
    }
}

/// Extract a snapshot of the model's trainable parameters
pub fn get_weights<M: Model + ?Sized>(model: &M) -> Weights {
    let tensors = model
        .named_parameters()
        .into_iter()
        .map(|(name, tensor)| {
            let weight = WeightTensor {
                shape: tensor.shape().to_vec(),
                data: tensor.data().to_vec(),
            };
            (name, weight)
        })
        .collect();
    Weights { tensors }
}

/// Copy a snapshot back into a model with the same architecture
pub fn load_weights<M: Model + ?Sized>(model: &mut M, weights: &Weights) -> Result<()> {
    let params = model.named_parameters_mut();
    if params.len() != weights.len() {
        return Err(Error::Checkpoint(format!(
            "snapshot has {} tensors, model has {}",
            weights.len(),
            params.len()
        )));
    }

    for (name, param) in params {
        let stored = weights
            .get(&name)
            .ok_or_else(|| Error::Checkpoint(format!("snapshot is missing parameter '{name}'")))?;
        if stored.shape != param.shape() {
            return Err(Error::ShapeMismatch {
                expected: param.shape().to_vec(),
                got: stored.shape.clone(),
            });
        }
        param
            .data_mut()
            .iter_mut()
            .zip(stored.data.iter())
            .for_each(|(dst, src)| *dst = *src);
    }
    Ok(())
}
