//! Integration tests: end-to-end graphs plus finite-difference validation
//! of the autodiff gradients.

use tensorgrad_core::prelude::*;

/// Rebuild `f = sum(abs(a * b - c))` as a fresh graph and return its scalar
/// value. Used as the function under test for finite differences.
fn abs_product_loss(a: &Tensor, b: &Tensor, c: &Tensor) -> f32 {
    let a = Variable::from_tensor(a.clone());
    let b = Variable::from_tensor(b.clone());
    let c = Variable::from_tensor(c.clone());
    let diff = a.multiply(&b).unwrap().subtract(&c).unwrap();
    diff.abs().sum().item()
}

#[test]
fn autodiff_matches_finite_differences() {
    let shape = Shape::matrix(2, 2).unwrap();
    let a_t = Tensor::from_vec(vec![0.5, -1.5, 2.0, 3.0], shape.clone());
    let b_t = Tensor::from_vec(vec![1.0, 2.0, -0.5, 1.5], shape.clone());
    let c_t = Tensor::from_vec(vec![0.25, 1.0, 0.75, -2.0], shape);

    let a = Variable::from_tensor(a_t.clone());
    let b = Variable::from_tensor(b_t.clone());
    let c = Variable::from_tensor(c_t.clone());

    let loss = a
        .multiply(&b)
        .unwrap()
        .subtract(&c)
        .unwrap()
        .abs()
        .sum();
    loss.backward().unwrap();

    let eps = 1e-2;
    let fd_a = finite_diff_grad(|t| abs_product_loss(t, &b_t, &c_t), &a_t, eps);
    let fd_b = finite_diff_grad(|t| abs_product_loss(&a_t, t, &c_t), &b_t, eps);
    let fd_c = finite_diff_grad(|t| abs_product_loss(&a_t, &b_t, t), &c_t, eps);

    assert!(max_grad_error(&a.grad(), &fd_a).unwrap() < 1e-2);
    assert!(max_grad_error(&b.grad(), &fd_b).unwrap() < 1e-2);
    assert!(max_grad_error(&c.grad(), &fd_c).unwrap() < 1e-2);
}

#[test]
fn end_to_end_product_sum() {
    // Spec'd scenario: a = 2x2 of 3s, b = 2x2 of 4s.
    let a = Variable::new(&[2, 2]).unwrap();
    a.set_to_scalar(3.0);
    let b = Variable::new(&[2, 2]).unwrap();
    b.set_to_scalar(4.0);

    let c = a.multiply(&b).unwrap();
    let d = c.sum();

    assert_eq!(c.value().as_slice(), &[12.0; 4]);
    assert_eq!(d.item(), 48.0);

    let seed = Tensor::from_vec(vec![1.0], Shape::scalar());
    d.backward_with_seed(&seed).unwrap();

    assert_eq!(c.grad().as_slice(), &[1.0; 4]);
    assert_eq!(a.grad().as_slice(), &[4.0; 4]);
    assert_eq!(b.grad().as_slice(), &[3.0; 4]);
}

#[test]
fn reused_operand_accumulates_across_two_roots_of_one_graph() {
    // p = x + y and q = x * z combined into a single scalar root; x's
    // gradient is the sum of both paths' contributions.
    let x = Variable::from_vec(vec![1.0, 2.0], &[1, 2]).unwrap();
    let y = Variable::from_vec(vec![3.0, 4.0], &[1, 2]).unwrap();
    let z = Variable::from_vec(vec![5.0, 6.0], &[1, 2]).unwrap();

    let p = x.add(&y).unwrap();
    let q = x.multiply(&z).unwrap();
    let root = p.add(&q).unwrap().sum();
    root.backward().unwrap();

    // d(root)/dx = 1 + z.
    assert_eq!(x.grad().as_slice(), &[6.0, 7.0]);
    assert_eq!(y.grad().as_slice(), &[1.0, 1.0]);
    assert_eq!(z.grad().as_slice(), &[1.0, 2.0]);
}

#[test]
fn repeated_backward_compounds_through_retained_gradients() {
    // Gradients are accumulate-only: a second backward pass re-seeds the
    // root but keeps every other node's accumulator, so the intermediate's
    // retained gradient compounds into the leaves.
    let a = Variable::new(&[2, 2]).unwrap();
    a.set_to_scalar(2.0);
    let b = Variable::new(&[2, 2]).unwrap();
    b.set_to_scalar(5.0);

    let c = a.multiply(&b).unwrap();
    let d = c.sum();
    d.backward().unwrap();
    assert_eq!(c.grad().as_slice(), &[1.0; 4]);
    assert_eq!(a.grad().as_slice(), &[5.0; 4]);

    // Second pass: c accumulates another 1, and a is charged c.grad * b on
    // top of its retained 5s: 5 + 2*5 = 15.
    d.backward().unwrap();
    assert_eq!(c.grad().as_slice(), &[2.0; 4]);
    assert_eq!(a.grad().as_slice(), &[15.0; 4]);

    // A fresh pass requires an explicit reset on every node.
    a.zero_grad();
    c.zero_grad();
    assert_eq!(a.grad().as_slice(), &[0.0; 4]);
    assert_eq!(c.grad().as_slice(), &[0.0; 4]);
}

#[test]
fn failed_op_leaves_graph_usable() {
    let a = Variable::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    let b = Variable::from_vec(vec![1.0; 6], &[3, 2]).unwrap();

    assert!(matches!(
        a.add(&b),
        Err(TensorError::ShapeMismatch { .. })
    ));

    // Upstream variables remain valid and differentiable.
    let d = a.sum();
    d.backward().unwrap();
    assert_eq!(a.grad().as_slice(), &[1.0; 6]);
}

#[test]
fn uniform_leaves_flow_gradients() {
    let a = Variable::uniform(&[3, 3], -1.0, 1.0).unwrap();
    let b = Variable::uniform(&[3, 3], -1.0, 1.0).unwrap();

    let d = a.multiply(&b).unwrap().sum();
    d.backward().unwrap();

    assert_eq!(a.grad().as_slice(), b.value().as_slice());
    assert_eq!(b.grad().as_slice(), a.value().as_slice());
}
