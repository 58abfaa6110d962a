//! # tensorgrad_core - Reverse-mode Autodiff over Dense 2-D Tensors
//!
//! A minimal automatic-differentiation engine. Build leaf [`Variable`]s,
//! combine them with elementwise `add`/`subtract`/`multiply`, entrywise
//! `abs`, and a reduction `sum`, then run a backward pass to accumulate
//! gradients into every contributing operand.
//!
//! ## Quick Start
//!
//! ```
//! use tensorgrad_core::prelude::*;
//!
//! // Two 2x2 leaves.
//! let a = Variable::new(&[2, 2])?;
//! a.set_to_scalar(3.0);
//! let b = Variable::new(&[2, 2])?;
//! b.set_to_scalar(4.0);
//!
//! // d = sum(a * b)
//! let c = a.multiply(&b)?;
//! let d = c.sum();
//! assert_eq!(d.item(), 48.0);
//!
//! // Reverse-mode differentiation, seeded with ones at the root.
//! d.backward()?;
//! assert_eq!(a.grad().as_slice(), &[4.0; 4]);
//! assert_eq!(b.grad().as_slice(), &[3.0; 4]);
//! # Ok::<(), tensorgrad_core::TensorError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`Shape`]: validated per-axis extents (rank >= 1, extents >= 1).
//! - [`Tensor`]: exclusively-owned flat `f32` buffer plus its shape;
//!   elementwise ops require exactly matching shapes (no broadcasting).
//! - [`Variable`]: refcounted graph node pairing a value tensor with a
//!   same-shaped gradient accumulator and a [`GradMeta`] provenance record.
//! - Backward pass: DFS-postorder topological sort, reverse traversal,
//!   per-op local gradients accumulated (never overwritten) into operand
//!   gradients.
//! - [`finite_diff_grad`]: numerical gradients for validating the engine.
//!
//! The engine is single-threaded and synchronous; the graph is acyclic by
//! construction (operands always precede their results).

pub mod backward;
pub mod error;
pub mod finite_diff;
pub mod shape;
pub mod tensor;
pub mod variable;

pub use error::TensorError;
pub use finite_diff::{finite_diff_grad, max_grad_error};
pub use shape::Shape;
pub use tensor::Tensor;
pub use variable::{GradMeta, NodeId, VarOp, Variable};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::TensorError;
    pub use crate::finite_diff::{finite_diff_grad, max_grad_error};
    pub use crate::shape::Shape;
    pub use crate::tensor::Tensor;
    pub use crate::variable::{NodeId, VarOp, Variable};
}
