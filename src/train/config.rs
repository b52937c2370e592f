//! Trainer configuration

use super::LossParams;
use crate::device::DeviceSelector;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Trainer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    /// Progress reporting frequency as a fraction of one epoch's batches
    pub log_every: f64,

    pub max_epochs: usize,

    /// Resolved once when the trainer is built
    pub device: DeviceSelector,

    /// Extra parameters passed to every loss call
    pub loss_params: LossParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            log_every: 0.1,
            max_epochs: 10,
            device: DeviceSelector::Auto,
            loss_params: LossParams::new(),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_every(mut self, fraction: f64) -> Self {
        self.log_every = fraction;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }

    /// Add one extra loss parameter
    pub fn with_loss_param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.loss_params.insert(name.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.log_every.is_finite() && self.log_every > 0.0) {
            return Err(Error::ConfigError(format!(
                "log_every must be a positive fraction, got {}",
                self.log_every
            )));
        }
        if self.max_epochs == 0 {
            return Err(Error::ConfigError("max_epochs must be > 0".to_string()));
        }
        Ok(())
    }

    /// Batches between progress lines: `floor(log_every * total)`, at least 1
    pub fn log_interval(&self, total_batches: usize) -> usize {
        ((self.log_every * total_batches as f64).floor() as usize).max(1)
    }
}
