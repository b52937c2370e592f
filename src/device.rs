//! Compute device selection
//!
//! The device is resolved once when a [`Trainer`](crate::train::Trainer) is
//! built and then passed explicitly to everything that places data or state:
//! model constructors, data sources and the synchronization barrier.

use crate::error::{Error, Result};
use crate::model::Model;
use crate::optim::Optimizer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested device, as written in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelector {
    /// Accelerator if one is present, otherwise the host CPU
    #[default]
    Auto,
    Cpu,
    Accelerator,
}

/// A resolved execution device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Accelerator { ordinal: usize },
}

impl Device {
    /// Devices the bundled tensor engine can execute on.
    ///
    /// Tensors are host-resident `ndarray` buffers, so only the CPU is listed.
    pub fn available() -> Vec<Device> {
        vec![Device::Cpu]
    }

    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Accelerator { .. })
    }

    /// Barrier that forces all pending work on the model and optimizer state.
    ///
    /// Timing and loss read-out happen only after this returns.
    pub fn synchronize(&self, model: &dyn Model, optimizer: &dyn Optimizer) -> Result<()> {
        model.materialize(self)?;
        optimizer.materialize(self)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Accelerator { ordinal } => write!(f, "accelerator:{ordinal}"),
        }
    }
}

impl DeviceSelector {
    /// Resolve against the devices that are actually present
    pub fn resolve(self) -> Result<Device> {
        self.resolve_from(&Device::available())
    }

    pub fn resolve_from(self, available: &[Device]) -> Result<Device> {
        let accelerator = available.iter().copied().find(Device::is_accelerator);
        match self {
            DeviceSelector::Cpu => Ok(Device::Cpu),
            DeviceSelector::Auto => Ok(accelerator.unwrap_or(Device::Cpu)),
            DeviceSelector::Accelerator => accelerator.ok_or_else(|| {
                Error::ConfigError("accelerator requested but none is available".to_string())
            }),
        }
    }
}
