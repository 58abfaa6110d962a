//! Dense 2-D tensors: a flat row-major buffer plus its shape.

use std::fmt;

use rand::distributions::{Distribution, Uniform};

use crate::error::TensorError;
use crate::shape::Shape;

/// A dense tensor: a [`Shape`] plus a flat `f32` buffer in row-major order
/// (`flat = row * cols + col`).
///
/// Tensors are value-like and exclusively owned: `Clone` deep-copies the
/// buffer, and no operation mutates an input unless it is explicitly
/// in-place (`fill`, `scale`, `add_in_place`).
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Shape,
}

impl Tensor {
    /// Zero-filled tensor of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let data = vec![0.0; shape.numel()];
        Tensor { data, shape }
    }

    /// Zero-filled tensor with the same shape as `other`. Used for gradient
    /// buffers and as the basis for elementwise-op outputs.
    pub fn zeros_like(other: &Tensor) -> Self {
        Tensor::zeros(other.shape.clone())
    }

    /// Tensor with every entry set to `value`.
    pub fn full(shape: Shape, value: f32) -> Self {
        let data = vec![value; shape.numel()];
        Tensor { data, shape }
    }

    /// Build a tensor from a flat row-major buffer.
    ///
    /// Panics if `data.len()` does not equal the shape's entry count; that
    /// is a programmer error, not a runtime condition.
    pub fn from_vec(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} doesn't match shape {} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor { data, shape }
    }

    /// Build a tensor by evaluating `f(row, col)` for every entry.
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let (rows, cols) = (shape.rows(), shape.cols());
        let mut data = Vec::with_capacity(shape.numel());
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Tensor { data, shape }
    }

    /// Tensor with entries drawn uniformly from `[lo, hi)`.
    pub fn uniform(shape: Shape, lo: f32, hi: f32) -> Self {
        let between = Uniform::new(lo, hi);
        let mut rng = rand::thread_rng();
        let data = (0..shape.numel()).map(|_| between.sample(&mut rng)).collect();
        Tensor { data, shape }
    }

    /// Get the shape of this tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Total number of entries.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Entries as a flat row-major slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable flat access.
    pub fn as_slice_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Read the single entry of a 1-element tensor.
    ///
    /// Panics if the tensor has more than one entry.
    pub fn item(&self) -> f32 {
        assert_eq!(self.numel(), 1, "item() on a {} tensor", self.shape);
        self.data[0]
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<usize, TensorError> {
        let (rows, cols) = (self.shape.rows(), self.shape.cols());
        if row >= rows || col >= cols {
            return Err(TensorError::IndexOutOfRange { row, col, rows, cols });
        }
        Ok(row * cols + col)
    }

    /// Read the entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<f32, TensorError> {
        let idx = self.check_bounds(row, col)?;
        Ok(self.data[idx])
    }

    /// Overwrite the entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<(), TensorError> {
        let idx = self.check_bounds(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Overwrite every entry in place.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Scale every entry in place.
    pub fn scale(&mut self, k: f32) {
        for x in &mut self.data {
            *x *= k;
        }
    }

    /// Combine two tensors entrywise into a fresh tensor.
    ///
    /// Shapes must match exactly; broadcasting of unequal shapes is not
    /// supported.
    pub fn zip(
        &self,
        other: &Tensor,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Tensor, TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Tensor { data, shape: self.shape.clone() })
    }

    /// Entrywise addition.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip(other, |a, b| a + b)
    }

    /// Entrywise subtraction.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip(other, |a, b| a - b)
    }

    /// Entrywise multiplication.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        self.zip(other, |a, b| a * b)
    }

    /// Accumulate `other` into this tensor in place (`self += other`).
    pub fn add_in_place(&mut self, other: &Tensor) -> Result<(), TensorError> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// Map every entry through `f` into a fresh tensor.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Entrywise absolute value.
    pub fn abs_map(&self) -> Tensor {
        self.map(f32::abs)
    }

    /// Entrywise derivative of absolute value: +1 for positive entries, -1
    /// for negative ones, and 0 at exactly zero.
    ///
    /// abs is not differentiable at zero; 0 is this crate's convention for
    /// the subgradient there. Note `f32::signum` returns +/-1 at +/-0.0, so
    /// the sign is computed by comparison.
    pub fn abs_grad(&self) -> Tensor {
        self.map(|x| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
    }

    /// Sum of all entries, as a 1x1 tensor.
    pub fn sum(&self) -> Tensor {
        let total = self.data.iter().sum();
        Tensor::from_vec(vec![total], Shape::scalar())
    }

    /// Gradient of [`Tensor::sum`] with respect to each entry: all ones,
    /// shaped like this tensor. Scaled by the upstream gradient during
    /// backward composition.
    pub fn sum_grad(&self) -> Tensor {
        Tensor::full(self.shape.clone(), 1.0)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .finish()
    }
}

/// Row-per-line, space-separated entries, followed by the row/column counts.
/// A debugging aid, not a stable format.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols = self.shape.cols();
        for row in 0..self.shape.rows() {
            for col in 0..cols {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.data[row * cols + col])?;
            }
            writeln!(f)?;
        }
        writeln!(f, "num_rows: {}", self.shape.rows())?;
        write!(f, "num_columns: {}", cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize, data: Vec<f32>) -> Tensor {
        Tensor::from_vec(data, Shape::matrix(rows, cols).unwrap())
    }

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(Shape::matrix(2, 3).unwrap());
        assert_eq!(t.numel(), 6);
        assert!(t.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_clone_is_independent() {
        let t = matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let mut c = t.clone();
        assert_eq!(c.shape(), t.shape());
        assert_eq!(c.as_slice(), t.as_slice());
        c.set(0, 0, 99.0).unwrap();
        assert_eq!(t.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_row_major_indexing() {
        let t = matrix(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        // (row, col) and flat order must agree: flat = row * cols + col.
        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(t.get(row, col).unwrap(), (row * 3 + col) as f32);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let mut t = Tensor::zeros(Shape::matrix(2, 3).unwrap());
        assert_eq!(
            t.get(2, 0),
            Err(TensorError::IndexOutOfRange { row: 2, col: 0, rows: 2, cols: 3 })
        );
        assert_eq!(
            t.set(0, 3, 1.0),
            Err(TensorError::IndexOutOfRange { row: 0, col: 3, rows: 2, cols: 3 })
        );
    }

    #[test]
    fn test_fill_and_scale() {
        let mut t = Tensor::zeros(Shape::matrix(2, 2).unwrap());
        t.fill(3.0);
        assert_eq!(t.as_slice(), &[3.0; 4]);
        t.scale(-1.0);
        assert_eq!(t.as_slice(), &[-3.0; 4]);
    }

    #[test]
    fn test_elementwise_laws() {
        let a = matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let b = matrix(2, 2, vec![5.0, 6.0, 7.0, 8.0]);

        assert_eq!(a.add(&b).unwrap().as_slice(), &[6.0, 8.0, 10.0, 12.0]);
        assert_eq!(a.sub(&b).unwrap().as_slice(), &[-4.0; 4]);
        assert_eq!(a.mul(&b).unwrap().as_slice(), &[5.0, 12.0, 21.0, 32.0]);
    }

    #[test]
    fn test_shape_mismatch_leaves_inputs_unmodified() {
        let a = Tensor::full(Shape::matrix(2, 3).unwrap(), 1.0);
        let b = Tensor::full(Shape::matrix(3, 2).unwrap(), 2.0);
        let err = a.add(&b).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                left: Shape::matrix(2, 3).unwrap(),
                right: Shape::matrix(3, 2).unwrap(),
            }
        );
        assert_eq!(a.as_slice(), &[1.0; 6]);
        assert_eq!(b.as_slice(), &[2.0; 6]);
    }

    #[test]
    fn test_abs_map_and_grad() {
        let t = matrix(1, 4, vec![-2.0, 0.0, 3.0, -0.5]);
        assert_eq!(t.abs_map().as_slice(), &[2.0, 0.0, 3.0, 0.5]);
        // Sign convention at zero is 0, not signum's +1.
        assert_eq!(t.abs_grad().as_slice(), &[-1.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_sum_is_scalar_and_order_invariant() {
        let t = matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let reordered = matrix(2, 2, vec![4.0, 1.0, 3.0, 2.0]);
        assert_eq!(t.sum().numel(), 1);
        assert_eq!(t.sum().item(), 10.0);
        assert_eq!(t.sum().item(), reordered.sum().item());
    }

    #[test]
    fn test_sum_grad_is_ones() {
        let t = matrix(2, 3, vec![1.0; 6]);
        let g = t.sum_grad();
        assert_eq!(g.shape(), t.shape());
        assert_eq!(g.as_slice(), &[1.0; 6]);
    }

    #[test]
    fn test_add_in_place_accumulates() {
        let mut acc = Tensor::zeros(Shape::matrix(2, 2).unwrap());
        let g = Tensor::full(Shape::matrix(2, 2).unwrap(), 1.5);
        acc.add_in_place(&g).unwrap();
        acc.add_in_place(&g).unwrap();
        assert_eq!(acc.as_slice(), &[3.0; 4]);
    }

    #[test]
    fn test_from_fn() {
        let t = Tensor::from_fn(Shape::matrix(2, 2).unwrap(), |r, c| (r * 10 + c) as f32);
        assert_eq!(t.as_slice(), &[0.0, 1.0, 10.0, 11.0]);
    }

    #[test]
    fn test_uniform_range() {
        let t = Tensor::uniform(Shape::matrix(4, 4).unwrap(), -1.0, 1.0);
        assert!(t.as_slice().iter().all(|&x| (-1.0..1.0).contains(&x)));
    }

    #[test]
    fn test_display() {
        let t = matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.to_string(), "1 2\n3 4\nnum_rows: 2\nnum_columns: 2");
    }
}
