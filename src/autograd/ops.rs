//! Autograd operations with backward passes

use super::{BackwardOp, GradCell, Tensor};
use crate::error::{Error, Result};
use ndarray::Array1;
use std::rc::Rc;

fn check_same_len(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::ShapeMismatch {
            expected: a.shape().to_vec(),
            got: b.shape().to_vec(),
        });
    }
    Ok(())
}

fn propagate(input: &Tensor) {
    if let Some(op) = input.backward_op() {
        op.backward();
    }
}

/// Add two tensors element-wise
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    check_same_len(a, b)?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::shaped(a.data() + b.data(), a.shape().to_vec(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    Ok(result)
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad.clone());
            }
            propagate(&self.a);
            propagate(&self.b);
        }
    }
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    check_same_len(a, b)?;
    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::shaped(a.data() * b.data(), a.shape().to_vec(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(MulBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    Ok(result)
}

struct MulBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for MulBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            // ∂L/∂a = ∂L/∂out * b, ∂L/∂b = ∂L/∂out * a
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * self.b.data());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad * self.a.data());
            }
            propagate(&self.a);
            propagate(&self.b);
        }
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let requires_grad = a.requires_grad();
    let mut result = Tensor::shaped(a.data() * factor, a.shape().to_vec(), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(ScaleBackward {
            a: a.clone(),
            factor,
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: f32,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * self.factor);
            }
            propagate(&self.a);
        }
    }
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let requires_grad = a.requires_grad();
    let mut result = Tensor::shaped(
        a.data().mapv(|x| x.max(0.0)),
        a.shape().to_vec(),
        requires_grad,
    );

    if requires_grad {
        result.set_backward_op(Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (a > 0)
                let mask = self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                self.a.accumulate_grad(grad * &mask);
            }
            propagate(&self.a);
        }
    }
}

/// Sum all elements into a scalar
pub fn sum(a: &Tensor) -> Tensor {
    let requires_grad = a.requires_grad();
    let mut result = Tensor::new(Array1::from(vec![a.data().sum()]), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(SumBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct SumBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for SumBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(Array1::from_elem(self.a.len(), grad[0]));
            }
            propagate(&self.a);
        }
    }
}

/// Arithmetic mean of all elements; an empty tensor averages to zero.
pub fn mean(a: &Tensor) -> Tensor {
    let n = a.len().max(1) as f32;
    scale(&sum(a), 1.0 / n)
}

/// Matrix multiplication `C = A @ B`
///
/// `a` must be `[m, k]` and `b` must be `[k, n]`; the result is `[m, n]`.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (m, k) = as_matrix(a)?;
    let (k_b, n) = as_matrix(b)?;
    if k != k_b {
        return Err(Error::ShapeMismatch {
            expected: vec![k, n],
            got: b.shape().to_vec(),
        });
    }

    let a_data = a.data();
    let b_data = b.data();
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a_data[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += a_ip * b_data[p * n + j];
            }
        }
    }

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::shaped(Array1::from(out), vec![m, n], requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        }));
    }

    Ok(result)
}

fn as_matrix(t: &Tensor) -> Result<(usize, usize)> {
    match t.shape() {
        [rows, cols] => Ok((*rows, *cols)),
        other => Err(Error::ShapeMismatch {
            expected: vec![t.rows(), t.row_len()],
            got: other.to_vec(),
        }),
    }
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: GradCell,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let (m, k, n) = (self.m, self.k, self.n);

            // ∂L/∂A = ∂L/∂C @ B^T
            if self.a.requires_grad() {
                let b = self.b.data();
                let mut grad_a = vec![0.0; m * k];
                for i in 0..m {
                    for p in 0..k {
                        let mut acc = 0.0;
                        for j in 0..n {
                            acc += grad_output[i * n + j] * b[p * n + j];
                        }
                        grad_a[i * k + p] = acc;
                    }
                }
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            // ∂L/∂B = A^T @ ∂L/∂C
            if self.b.requires_grad() {
                let a = self.a.data();
                let mut grad_b = vec![0.0; k * n];
                for i in 0..m {
                    for p in 0..k {
                        let a_ip = a[i * k + p];
                        for j in 0..n {
                            grad_b[p * n + j] += a_ip * grad_output[i * n + j];
                        }
                    }
                }
                self.b.accumulate_grad(Array1::from(grad_b));
            }

            propagate(&self.a);
            propagate(&self.b);
        }
    }
}

/// Add a `[n]` bias to every row of a `[m, n]` matrix
pub fn add_bias(x: &Tensor, bias: &Tensor) -> Result<Tensor> {
    let (m, n) = as_matrix(x)?;
    if bias.len() != n {
        return Err(Error::ShapeMismatch {
            expected: vec![n],
            got: bias.shape().to_vec(),
        });
    }

    let mut out = x.data().clone();
    for (i, v) in out.iter_mut().enumerate() {
        *v += bias.data()[i % n];
    }

    let requires_grad = x.requires_grad() || bias.requires_grad();
    let mut result = Tensor::shaped(out, vec![m, n], requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(AddBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            cols: n,
            result_grad: result.grad_cell(),
        }));
    }

    Ok(result)
}

struct AddBiasBackward {
    x: Tensor,
    bias: Tensor,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                self.x.accumulate_grad(grad.clone());
            }
            // bias gradient sums over the batch rows
            if self.bias.requires_grad() {
                let mut grad_bias = Array1::zeros(self.cols);
                for (i, g) in grad.iter().enumerate() {
                    grad_bias[i % self.cols] += g;
                }
                self.bias.accumulate_grad(grad_bias);
            }
            propagate(&self.x);
            propagate(&self.bias);
        }
    }
}
