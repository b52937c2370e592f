//! Tensor type with gradient tracking

use super::BackwardOp;
use crate::error::{Error, Result};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared gradient slot; clones of a tensor accumulate into the same cell.
pub(crate) type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Row-major tensor with automatic differentiation support
///
/// Data is stored flat; `shape` records the logical dimensions with the
/// batch dimension first.
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    shape: Vec<usize>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a one-dimensional tensor
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a one-dimensional tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a tensor with an explicit shape
    pub fn with_shape(data: Vec<f32>, shape: &[usize], requires_grad: bool) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        let mut tensor = Self::from_vec(data, requires_grad);
        tensor.shape = shape.to_vec();
        Ok(tensor)
    }

    /// Build from raw parts; `shape` must cover `data` exactly.
    pub(crate) fn shaped(data: Array1<f32>, shape: Vec<usize>, requires_grad: bool) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        let mut tensor = Self::new(data, requires_grad);
        tensor.shape = shape;
        tensor
    }

    /// Create a `rows x cols` matrix
    pub fn matrix(rows: usize, cols: usize, data: Vec<f32>, requires_grad: bool) -> Result<Self> {
        Self::with_shape(data, &[rows, cols], requires_grad)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Mutable access to the values; the shape is left untouched.
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Size of the leading (batch) dimension
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Number of elements per row
    pub fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Get gradient (if computed)
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Accumulate gradient (for when tensor is used multiple times)
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub(crate) fn grad_cell(&self) -> GradCell {
        self.grad.clone()
    }

    pub(crate) fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Copy of the values cut off from the tape
    pub fn detach(&self) -> Tensor {
        Tensor {
            data: self.data.clone(),
            shape: self.shape.clone(),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
