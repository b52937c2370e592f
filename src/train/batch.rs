//! Training batch

use crate::autograd::Tensor;
use crate::error::{Error, Result};

/// An `(inputs, targets)` pair whose leading dimension is the batch size
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

impl Batch {
    /// Pair inputs with targets; both must have the same number of rows.
    pub fn new(inputs: Tensor, targets: Tensor) -> Result<Self> {
        if inputs.rows() != targets.rows() {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs.rows()],
                got: vec![targets.rows()],
            });
        }
        Ok(Self { inputs, targets })
    }

    /// Number of examples in the batch
    pub fn size(&self) -> usize {
        self.inputs.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_is_leading_dim() {
        let batch = Batch::new(
            Tensor::matrix(4, 2, vec![0.0; 8], false).unwrap(),
            Tensor::from_vec(vec![0.0, 1.0, 0.0, 1.0], false),
        )
        .unwrap();
        assert_eq!(batch.size(), 4);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_row_mismatch_rejected() {
        let err = Batch::new(
            Tensor::matrix(3, 2, vec![0.0; 6], false).unwrap(),
            Tensor::from_vec(vec![0.0, 1.0], false),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_batch() {
        let batch = Batch::new(
            Tensor::matrix(0, 2, vec![], false).unwrap(),
            Tensor::from_vec(vec![], false),
        )
        .unwrap();
        assert!(batch.is_empty());
    }
}
