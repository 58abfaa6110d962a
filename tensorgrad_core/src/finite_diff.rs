//! Numerical gradient checking.
//!
//! Central-difference gradients of a scalar-valued function of a tensor,
//! used to validate the backward pass entry for entry.

use crate::error::TensorError;
use crate::tensor::Tensor;

/// Differentiate `f` numerically at the tensor `at`.
///
/// Each entry of `at` is bumped by `eps` in both directions (central
/// differences; `eps` of 1e-3 to 1e-2 works well for f32). Returns a
/// gradient tensor shaped like `at`, directly comparable to what the
/// backward pass accumulates.
pub fn finite_diff_grad<F>(f: F, at: &Tensor, eps: f32) -> Tensor
where
    F: Fn(&Tensor) -> f32,
{
    let mut grad = Tensor::zeros_like(at);
    let mut point = at.clone();

    for i in 0..at.numel() {
        let x = at.as_slice()[i];

        point.as_slice_mut()[i] = x + eps;
        let above = f(&point);

        point.as_slice_mut()[i] = x - eps;
        let below = f(&point);

        point.as_slice_mut()[i] = x;

        grad.as_slice_mut()[i] = (above - below) / (2.0 * eps);
    }

    grad
}

/// Largest entrywise absolute difference between two gradient tensors.
///
/// Fails with [`TensorError::ShapeMismatch`] if the tensors are shaped
/// differently.
pub fn max_grad_error(computed: &Tensor, reference: &Tensor) -> Result<f32, TensorError> {
    let diff = computed.zip(reference, |a, b| (a - b).abs())?;
    Ok(diff.as_slice().iter().fold(0.0, |m, &d| f32::max(m, d)))
}
