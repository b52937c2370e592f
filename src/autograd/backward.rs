//! Backward operation trait

/// A node on the gradient tape
///
/// Implementations read the gradient of their output, push partial
/// derivatives into their inputs and recurse into the inputs' own ops.
pub trait BackwardOp {
    fn backward(&self);
}
