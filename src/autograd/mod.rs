//! Tape-based autograd engine
//!
//! Every op records a [`BackwardOp`] on its output. Calling [`backward`] on a
//! scalar seeds its gradient with one and walks the tape back to the leaves,
//! accumulating into the gradient cells shared by all clones of a tensor.

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::{add, add_bias, matmul, mean, mul, relu, scale, sum};
pub use tensor::Tensor;

pub(crate) use tensor::GradCell;

/// Perform backward pass on a tensor
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
