//! Adapter that exposes a user [`Objective`] as an `argmin` problem.
//!
//! The cost is passed through unchanged; non-finite values are turned into
//! `OptError::NonFiniteCost` so the solver stops instead of stepping into a
//! NaN region. Missing analytic gradients fall back to finite differences of
//! the same cost.
use crate::optimization::{
    errors::OptError,
    minimizer::{
        finite_diff::fd_gradient,
        traits::Objective,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a user [`Objective`] to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: Objective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<F: Objective> CostFunction for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `c(θ)`, rejecting non-finite values.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err(OptError::NonFiniteCost { value: output }.into());
        }
        Ok(output)
    }
}

impl<F: Objective> Gradient for ArgMinAdapter<'_, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate `∇c(θ)`.
    ///
    /// - Analytic gradients are validated (dimension, finiteness).
    /// - `GradientNotImplemented` triggers [`fd_gradient`] on the cost.
    /// - Any other user error is propagated.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(g)
            }
            Err(OptError::GradientNotImplemented) => Ok(fd_gradient(theta, |t| self.cost(t))?),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_relative_eq;
    use ndarray::array;

    struct Shifted;

    impl Objective for Shifted {
        type Data = f64;
        fn value(&self, theta: &Theta, shift: &f64) -> OptResult<Cost> {
            Ok(theta.mapv(|t| (t - shift).powi(2)).sum())
        }
        fn check(&self, _: &Theta, _: &f64) -> OptResult<()> {
            Ok(())
        }
    }

    struct Exploding;

    impl Objective for Exploding {
        type Data = ();
        fn value(&self, _: &Theta, _: &()) -> OptResult<Cost> {
            Ok(f64::NAN)
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient the adapter differentiates the cost.
    //
    // Given
    // -----
    // - c(θ) = Σ (θᵢ − 1)² at θ = (0, 3).
    //
    // Expect
    // ------
    // - ∇c ≈ (−2, 4).
    fn gradient_falls_back_to_finite_differences() {
        let shift = 1.0;
        let adapter = ArgMinAdapter::new(&Shifted, &shift);
        let g = adapter.gradient(&array![0.0, 3.0]).expect("gradient");
        assert_relative_eq!(g[0], -2.0, epsilon = 1e-5);
        assert_relative_eq!(g[1], 4.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite costs are reported as `NonFiniteCost`.
    //
    // Given
    // -----
    // - An objective returning NaN.
    //
    // Expect
    // ------
    // - `cost` fails and the error converts back to `NonFiniteCost`.
    fn cost_rejects_non_finite_values() {
        let adapter = ArgMinAdapter::new(&Exploding, &());
        let err = adapter.cost(&array![0.0]).expect_err("NaN must be rejected");
        assert!(matches!(OptError::from(err), OptError::NonFiniteCost { .. }));
    }
}
