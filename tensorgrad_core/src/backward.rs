//! Reverse-mode differentiation: graph traversal and per-op local gradients.
//!
//! The backward pass:
//! 1. Builds a topological ordering of the nodes reachable from the root.
//! 2. Traverses in reverse order, computing each operand's gradient
//!    contribution from the producing op and accumulating it into that
//!    operand's gradient tensor.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::variable::{NodeId, VarOp, Variable};

/// Run the backward pass from `root`, seeding its gradient to all-ones.
pub fn backward(root: &Variable) -> Result<(), TensorError> {
    let seed = root.value().sum_grad();
    root.set_grad(seed);
    propagate(root)
}

/// Run the backward pass from `root` with a caller-supplied seed.
pub fn backward_with_seed(root: &Variable, seed: &Tensor) -> Result<(), TensorError> {
    let root_shape = root.shape();
    if *seed.shape() != root_shape {
        return Err(TensorError::ShapeMismatch {
            left: root_shape,
            right: seed.shape().clone(),
        });
    }
    root.set_grad(seed.clone());
    propagate(root)
}

/// Propagate whatever gradient is seeded at `root` down to the leaves.
///
/// Reverse topological order guarantees that every node is visited only
/// after all of its consumers have contributed, so its accumulated gradient
/// is complete when its own operands are charged.
#[instrument(skip_all, fields(root = ?root.id()))]
fn propagate(root: &Variable) -> Result<(), TensorError> {
    let order = topological_sort(root);
    debug!(nodes = order.len(), "running backward pass");

    for var in order.iter().rev() {
        if var.is_leaf() {
            continue;
        }
        let contributions = operand_gradients(var)?;
        for (operand, contribution) in var.operands().iter().zip(contributions.iter()) {
            // Accumulate, never overwrite: an operand feeding several
            // downstream ops receives the sum of all contributions.
            operand.accumulate_grad(contribution)?;
        }
    }
    Ok(())
}

/// Compute the gradient contribution for each operand of `child`, shaped
/// exactly like that operand.
fn operand_gradients(child: &Variable) -> Result<Vec<Tensor>, TensorError> {
    let operands = child.operands();
    let grad = child.grad();

    let grads = match child.op() {
        VarOp::Leaf => vec![],

        // d(a+b)/da = 1, d(a+b)/db = 1: the child's gradient passes through
        // to both operands.
        VarOp::Add => vec![grad.clone(), grad.clone()],

        // d(a-b)/da = 1, d(a-b)/db = -1.
        VarOp::Sub => {
            let mut negated = grad.clone();
            negated.scale(-1.0);
            vec![grad.clone(), negated]
        }

        // d(a*b)/da = b, d(a*b)/db = a.
        VarOp::Mul => {
            let a = operands[0].value();
            let b = operands[1].value();
            vec![grad.mul(&b)?, grad.mul(&a)?]
        }

        // d(|a|)/da = sign(a), with 0 at exactly zero.
        VarOp::Abs => {
            let a = operands[0].value();
            vec![a.abs_grad().mul(&grad)?]
        }

        // The child is 1x1; every entry of the operand contributed with
        // weight 1, scaled by the upstream scalar gradient.
        VarOp::Sum => {
            let upstream = grad.item();
            let mut g = operands[0].value().sum_grad();
            g.scale(upstream);
            vec![g]
        }
    };

    Ok(grads)
}

/// Topological sort via DFS postorder, keyed by node identity so a node
/// reachable through multiple paths is processed once.
///
/// Uses an explicit work stack: each node is pushed once to expand its
/// operands and once more to emit it, so graphs deeper than the call stack
/// are fine.
fn topological_sort(root: &Variable) -> Vec<Variable> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((var, expanded)) = stack.pop() {
        if expanded {
            order.push(var);
            continue;
        }
        if !visited.insert(var.id()) {
            continue;
        }
        stack.push((var.clone(), true));
        for operand in var.operands() {
            if !visited.contains(&operand.id()) {
                stack.push((operand.clone(), false));
            }
        }
    }

    order
}
