//! Error taxonomy for tensor and graph operations.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised by tensor construction and elementwise operations.
///
/// All of these are caller-facing contract violations: the failing operation
/// aborts with no partial mutation of any existing tensor, and upstream
/// variables remain valid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    /// A shape was constructed with rank 0 or a zero extent.
    #[error("invalid shape {dims:?}: rank must be >= 1 and every extent >= 1")]
    InvalidShape { dims: Vec<usize> },

    /// A binary elementwise operation was given operands of unequal shape.
    /// Broadcasting of unequal shapes is not supported.
    #[error("shape mismatch: {left} vs {right}")]
    ShapeMismatch { left: Shape, right: Shape },

    /// An entry access fell outside the tensor's bounds.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} tensor")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}
