//! Core error types for imgfuse-ir.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! all anticipated failure modes in the tensor-expression data model.

use thiserror::Error;

/// Core errors produced while constructing or querying the IR.
#[derive(Debug, Error)]
pub enum IrError {
    /// A `ScalarVar` indexed a tensor with the wrong number of indices.
    #[error("shape arity mismatch on tensor '{tensor}': expected {expected} indices, got {got}")]
    ShapeArityMismatch {
        tensor: String,
        expected: usize,
        got: usize,
    },

    /// An `IterVar` was referenced outside any enclosing `ComputeOp`/`For`/`Reduce`.
    #[error("unbound iteration variable: '{name}'")]
    UnboundVariable { name: String },

    /// Two distinct producers were registered for the same tensor name.
    #[error("tensor '{name}' has more than one producer")]
    DuplicateProducer { name: String },

    /// A tensor was referenced but never defined.
    #[error("tensor '{name}' has no producer")]
    UndefinedTensor { name: String },
}
