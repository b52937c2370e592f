//! Error types for entrenar-fit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Throughput undefined for batch of size {batch_size}")]
    DegenerateThroughput { batch_size: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
