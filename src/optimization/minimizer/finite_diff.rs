//! minimizer::finite_diff — finite-difference gradients with error capture.
//!
//! Purpose
//! -------
//! Approximate the gradient of a cost when an [`Objective`](super::Objective)
//! does not provide one, without letting errors raised inside the cost
//! closure disappear into `NaN`s.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`] tries central differences first and falls back to
//!   forward differences when the central pass captured an error or produced
//!   a gradient that fails [`validate_grad`].
//! - [`run_fd_diff`] is the forward-difference pass with error capture.
//!
//! Invariants & assumptions
//! ------------------------
//! - The FD closure must return `f64`, so errors are routed into the shared
//!   `closure_err` cell and the closure returns `NaN`. Only the first error
//!   is kept.
//! - Returned gradients always satisfy [`validate_grad`].
use crate::optimization::{
    errors::OptResult,
    minimizer::{
        types::{Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central-then-forward finite-difference gradient of `cost` at `theta`.
///
/// Parameters
/// ----------
/// - `theta`: point at which the gradient is approximated.
/// - `cost`: fallible scalar objective.
///
/// Errors
/// ------
/// - The first error raised by `cost` during the forward pass.
/// - `OptError::InvalidGradient` if the forward gradient is still non-finite.
pub fn fd_gradient<C>(theta: &Theta, cost: C) -> OptResult<Grad>
where
    C: Fn(&Theta) -> Result<f64, Error>,
{
    let closure_err: RefCell<Option<Error>> = RefCell::new(None);
    let cost_func = |t: &Theta| -> f64 {
        match cost(t) {
            Ok(val) => val,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };
    let central = theta.central_diff(&cost_func);
    if closure_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
        return Ok(central);
    }
    run_fd_diff(theta, &cost_func, &closure_err)
}

/// Forward-difference gradient of `func` at `theta`, with error capture.
///
/// Clears `closure_err`, runs `forward_diff`, returns any captured error,
/// then validates the gradient.
///
/// Errors
/// ------
/// - The error captured in `closure_err` (converted into `OptError`).
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Accuracy of the central path on a smooth cost.
    // - Propagation of errors raised inside the cost closure.
    //
    // They intentionally DO NOT cover:
    // - Solver behavior (see `api` and the resolver integration tests).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The central path reproduces an analytic gradient.
    //
    // Given
    // -----
    // - c(θ) = θ₀² + 3θ₁ at θ = (1, 2).
    //
    // Expect
    // ------
    // - ∇c ≈ (2, 3).
    fn fd_gradient_matches_analytic_quadratic() {
        let theta = array![1.0, 2.0];
        let g = fd_gradient(&theta, |t| Ok(t[0] * t[0] + 3.0 * t[1])).expect("gradient");
        assert_relative_eq!(g[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(g[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Errors raised by the cost are surfaced, not hidden in NaNs.
    //
    // Given
    // -----
    // - A cost that always fails with `NonFiniteCost`.
    //
    // Expect
    // ------
    // - `fd_gradient` returns that error.
    fn fd_gradient_propagates_cost_errors() {
        let theta = array![0.0];
        let out = fd_gradient(&theta, |_| Err(OptError::NonFiniteCost { value: f64::INFINITY }.into()));
        assert_eq!(out, Err(OptError::NonFiniteCost { value: f64::INFINITY }));
    }
}
