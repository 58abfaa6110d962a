//! Computation graph nodes: a value tensor paired with its gradient
//! accumulator and provenance metadata.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::TensorError;
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Global counter for unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Unique identifier for a node in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u64);

/// The operation that produced a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOp {
    /// Not produced by a tracked operation (gradient flow stops here).
    Leaf,
    /// Elementwise addition of two operands.
    Add,
    /// Elementwise subtraction: operands[0] - operands[1].
    Sub,
    /// Elementwise multiplication of two operands.
    Mul,
    /// Entrywise absolute value.
    Abs,
    /// Reduction to a 1x1 total.
    Sum,
}

/// Provenance record for a variable: the producing operation plus the
/// operand variables that contributed to it (0 for leaves, 1 for unary ops,
/// 2 for binary ops).
///
/// Operand links point backwards through the graph; operands never reference
/// their results, so the graph is acyclic by construction.
pub struct GradMeta {
    pub(crate) op: VarOp,
    pub(crate) operands: Vec<Variable>,
}

impl GradMeta {
    fn leaf() -> Self {
        GradMeta { op: VarOp::Leaf, operands: vec![] }
    }
}

/// Internal node storage.
///
/// `value` and `grad` sit behind `RefCell` because a node is shared by every
/// downstream variable that consumed it, while `set_to_scalar` mutates the
/// value and the backward pass accumulates into the gradient. The engine is
/// single-threaded, so `Rc`/`RefCell` is the whole story.
struct VarNode {
    id: NodeId,
    value: RefCell<Tensor>,
    grad: RefCell<Tensor>,
    meta: GradMeta,
}

/// A node of the computation graph: a value [`Tensor`], a same-shaped
/// gradient accumulator (initially zero), and a [`GradMeta`].
///
/// `Variable` is a cheap refcounted handle; cloning shares the node.
#[derive(Clone)]
pub struct Variable(Rc<VarNode>);

impl Variable {
    fn with_meta(value: Tensor, meta: GradMeta) -> Self {
        let grad = Tensor::zeros_like(&value);
        Variable(Rc::new(VarNode {
            id: NodeId(next_node_id()),
            value: RefCell::new(value),
            grad: RefCell::new(grad),
            meta,
        }))
    }

    // === Constructors ===

    /// Zero-filled leaf variable with the given extents.
    ///
    /// Fails with [`TensorError::InvalidShape`] if `dims` is empty or
    /// contains a zero.
    pub fn new(dims: &[usize]) -> Result<Self, TensorError> {
        let shape = Shape::new(dims.to_vec())?;
        Ok(Self::from_tensor(Tensor::zeros(shape)))
    }

    /// Leaf variable owning the given tensor.
    pub fn from_tensor(tensor: Tensor) -> Self {
        Self::with_meta(tensor, GradMeta::leaf())
    }

    /// Leaf variable from a flat row-major buffer.
    pub fn from_vec(data: Vec<f32>, dims: &[usize]) -> Result<Self, TensorError> {
        let shape = Shape::new(dims.to_vec())?;
        Ok(Self::from_tensor(Tensor::from_vec(data, shape)))
    }

    /// Leaf variable populated by `f(row, col)`.
    pub fn from_fn(
        dims: &[usize],
        f: impl FnMut(usize, usize) -> f32,
    ) -> Result<Self, TensorError> {
        let shape = Shape::new(dims.to_vec())?;
        Ok(Self::from_tensor(Tensor::from_fn(shape, f)))
    }

    /// Leaf variable with entries drawn uniformly from `[lo, hi)`.
    pub fn uniform(dims: &[usize], lo: f32, hi: f32) -> Result<Self, TensorError> {
        let shape = Shape::new(dims.to_vec())?;
        Ok(Self::from_tensor(Tensor::uniform(shape, lo, hi)))
    }

    /// Fresh zero-filled leaf with the same shape as this variable.
    pub fn zeros_like(&self) -> Self {
        Self::from_tensor(Tensor::zeros_like(&self.0.value.borrow()))
    }

    /// Fresh leaf holding a deep copy of this variable's value.
    pub fn copied(&self) -> Self {
        Self::from_tensor(self.0.value.borrow().clone())
    }

    // === Accessors ===

    /// Unique node ID.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Borrow the value tensor.
    pub fn value(&self) -> Ref<'_, Tensor> {
        self.0.value.borrow()
    }

    /// Borrow the gradient tensor. Always shaped like the value.
    pub fn grad(&self) -> Ref<'_, Tensor> {
        self.0.grad.borrow()
    }

    /// The shape of the value (and gradient) tensor.
    pub fn shape(&self) -> Shape {
        self.0.value.borrow().shape().clone()
    }

    /// The operation that produced this variable.
    pub fn op(&self) -> VarOp {
        self.0.meta.op
    }

    /// The operand variables this one was computed from.
    pub fn operands(&self) -> &[Variable] {
        &self.0.meta.operands
    }

    /// True if this variable was not produced by a tracked operation.
    pub fn is_leaf(&self) -> bool {
        self.0.meta.operands.is_empty()
    }

    /// Read the single entry of a 1-element value tensor.
    pub fn item(&self) -> f32 {
        self.0.value.borrow().item()
    }

    // === Mutators ===

    /// Overwrite every entry of the value tensor. The gradient is untouched.
    pub fn set_to_scalar(&self, value: f32) {
        self.0.value.borrow_mut().fill(value);
    }

    /// Reset the gradient accumulator to zero.
    pub fn zero_grad(&self) {
        self.0.grad.borrow_mut().fill(0.0);
    }

    /// Replace the gradient tensor. The caller has already checked shapes.
    pub(crate) fn set_grad(&self, grad: Tensor) {
        *self.0.grad.borrow_mut() = grad;
    }

    /// Accumulate a gradient contribution (`grad += contribution`).
    pub(crate) fn accumulate_grad(&self, contribution: &Tensor) -> Result<(), TensorError> {
        self.0.grad.borrow_mut().add_in_place(contribution)
    }

    // === Atomic operations ===

    fn binary(
        &self,
        rhs: &Variable,
        op: VarOp,
        forward: fn(&Tensor, &Tensor) -> Result<Tensor, TensorError>,
        track_grad: bool,
    ) -> Result<Variable, TensorError> {
        let value = forward(&self.0.value.borrow(), &rhs.0.value.borrow())?;
        trace!(?op, lhs = self.0.id.0, rhs = rhs.0.id.0, track_grad, "forward");
        let meta = if track_grad {
            GradMeta { op, operands: vec![self.clone(), rhs.clone()] }
        } else {
            GradMeta::leaf()
        };
        Ok(Self::with_meta(value, meta))
    }

    fn unary(&self, op: VarOp, forward: fn(&Tensor) -> Tensor, track_grad: bool) -> Variable {
        let value = forward(&self.0.value.borrow());
        trace!(?op, arg = self.0.id.0, track_grad, "forward");
        let meta = if track_grad {
            GradMeta { op, operands: vec![self.clone()] }
        } else {
            GradMeta::leaf()
        };
        Self::with_meta(value, meta)
    }

    /// Elementwise addition. Fails with [`TensorError::ShapeMismatch`] on
    /// unequal operand shapes.
    pub fn add(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Add, Tensor::add, true)
    }

    /// Elementwise subtraction: `self - rhs`.
    pub fn subtract(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Sub, Tensor::sub, true)
    }

    /// Elementwise multiplication.
    pub fn multiply(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Mul, Tensor::mul, true)
    }

    /// Entrywise absolute value.
    pub fn abs(&self) -> Variable {
        self.unary(VarOp::Abs, Tensor::abs_map, true)
    }

    /// Sum of all entries, as a 1x1 variable.
    pub fn sum(&self) -> Variable {
        self.unary(VarOp::Sum, Tensor::sum, true)
    }

    /// Like [`Variable::add`] but the result is a leaf: no operand links are
    /// recorded, so a later backward pass will not flow through it. Used to
    /// build compositions that must not themselves be differentiated.
    pub fn add_untracked(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Add, Tensor::add, false)
    }

    /// Untracked variant of [`Variable::subtract`].
    pub fn subtract_untracked(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Sub, Tensor::sub, false)
    }

    /// Untracked variant of [`Variable::multiply`].
    pub fn multiply_untracked(&self, rhs: &Variable) -> Result<Variable, TensorError> {
        self.binary(rhs, VarOp::Mul, Tensor::mul, false)
    }

    /// Untracked variant of [`Variable::abs`].
    pub fn abs_untracked(&self) -> Variable {
        self.unary(VarOp::Abs, Tensor::abs_map, false)
    }

    /// Untracked variant of [`Variable::sum`].
    pub fn sum_untracked(&self) -> Variable {
        self.unary(VarOp::Sum, Tensor::sum, false)
    }

    // === Backward pass ===

    /// Run reverse-mode differentiation from this variable, seeding its
    /// gradient to all-ones. Gradient contributions accumulate into every
    /// reachable operand's gradient tensor.
    ///
    /// Accumulation is the only mutation: a repeated backward pass re-seeds
    /// this root but keeps every other node's gradient, so contributions
    /// compound through the retained intermediate gradients. For a fresh
    /// pass, call [`Variable::zero_grad`] on every node that should start
    /// from zero.
    pub fn backward(&self) -> Result<(), TensorError> {
        crate::backward::backward(self)
    }

    /// Run the backward pass with a caller-supplied seed instead of
    /// all-ones. Fails with [`TensorError::ShapeMismatch`] if the seed is
    /// not shaped like this variable.
    pub fn backward_with_seed(&self, seed: &Tensor) -> Result<(), TensorError> {
        crate::backward::backward_with_seed(self, seed)
    }

    // === Printing ===

    /// Write the value tensor to stdout. A debugging aid, not a stable
    /// format.
    pub fn display(&self) {
        println!("Tensor:\n{}", self.value());
    }

    /// Write the value and gradient tensors to stdout.
    pub fn display_with_gradient(&self) {
        println!("Tensor:\n{}", self.value());
        println!("Gradient:\n{}", self.grad());
    }
}

/// Dropping the last handle to a node unlinks its operand chain
/// iteratively. Left to the default glue, nested `Rc` drops recurse once per
/// graph level and overflow the stack on long op chains.
impl Drop for VarNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.meta.operands);
        while let Some(operand) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(operand.0) {
                pending.append(&mut node.meta.operands);
            }
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("id", &self.0.id)
            .field("op", &self.0.meta.op)
            .field("shape", self.0.value.borrow().shape())
            .field("operands", &self.0.meta.operands.len())
            .finish()
    }
}
