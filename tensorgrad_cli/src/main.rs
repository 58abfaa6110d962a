//! CLI demo for the tensorgrad autodiff engine.
//!
//! Builds a small computation graph over 2-D tensors, runs the backward
//! pass, prints the variables with their gradients, and validates one
//! gradient against finite differences.

use tensorgrad_core::prelude::*;

fn main() -> Result<(), TensorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Reverse-Mode Autodiff over 2-D Tensors ===\n");

    // d = sum(a * b) with a = 2x2 of 3s, b = 2x2 of 4s.
    let a = Variable::new(&[2, 2])?;
    a.set_to_scalar(3.0);
    let b = Variable::new(&[2, 2])?;
    b.set_to_scalar(4.0);

    let c = a.multiply(&b)?;
    let d = c.sum();

    println!("Expression: d = sum(a * b)");
    println!("d = {}\n", d.item());

    d.backward()?;

    println!("a (value and gradient):");
    a.display_with_gradient();
    println!("\nb (value and gradient):");
    b.display_with_gradient();

    // Cross-check d(d)/da against central finite differences.
    let a_point = a.value().clone();
    let b_point = b.value().clone();
    let f = |t: &Tensor| {
        let a = Variable::from_tensor(t.clone());
        let b = Variable::from_tensor(b_point.clone());
        a.multiply(&b).unwrap().sum().item()
    };
    let fd = finite_diff_grad(f, &a_point, 1e-2);
    let err = max_grad_error(&a.grad(), &fd)?;

    println!("\nFinite difference check (eps=1e-2):");
    println!("  dd/da (numerical) = {:?}", fd.as_slice());
    println!("  max error vs autodiff = {:.6}", err);

    Ok(())
}
