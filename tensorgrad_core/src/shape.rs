//! Tensor shapes: validated per-axis extents.

use std::fmt;

use crate::error::TensorError;

/// A tensor shape (per-axis extents).
///
/// Invariant: rank >= 1 and every extent >= 1, enforced at construction.
/// Immutable after construction; equality is by value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from extents.
    ///
    /// Fails with [`TensorError::InvalidShape`] if `dims` is empty or any
    /// extent is zero.
    pub fn new(dims: Vec<usize>) -> Result<Self, TensorError> {
        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(TensorError::InvalidShape { dims });
        }
        Ok(Shape(dims))
    }

    /// Create a 2-D shape.
    pub fn matrix(rows: usize, cols: usize) -> Result<Self, TensorError> {
        Shape::new(vec![rows, cols])
    }

    /// The scalar shape used by reductions.
    ///
    /// The rank >= 1 invariant rules out 0-dim shapes, so "scalar" here
    /// means 1x1.
    pub fn scalar() -> Self {
        Shape(vec![1, 1])
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Extent of the axis at `idx`.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    /// Extents as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of entries.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    /// Number of columns in the row-major 2-D view (the last extent).
    pub fn cols(&self) -> usize {
        self.0[self.0.len() - 1]
    }

    /// Number of rows in the row-major 2-D view. A rank-1 shape is a single
    /// row.
    pub fn rows(&self) -> usize {
        self.numel() / self.cols()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}
