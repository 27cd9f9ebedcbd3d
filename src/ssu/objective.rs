//! objective — the single-sample cost in unconstrained coordinates.
//!
//! Purpose
//! -------
//! Express `100 · Σ (mixture(x) − y)²` over the mixture layout as a cost of
//! an unconstrained vector θ, so L-BFGS can minimize it without bounds.
//!
//! Key behaviors
//! -------------
//! - Family parameters: `p = 1e−100 + softplus(θ)`, which keeps them inside
//!   their `(1e−100, +∞)` bounds.
//! - Fractions: the `k − 1` free logits plus a fixed zero logit go through a
//!   softmax; the first `k − 1` weights are the layout fractions. This keeps
//!   every fraction in `[0, 1]` and satisfies `Σ f_i ≤ 1`.
//! - The gradient chains the mixture Jacobian through both transforms.
use crate::{
    kernels::layout::MixtureLayout,
    optimization::{
        errors::{OptError, OptResult},
        minimizer::{Cost, Grad, Objective, Theta, validation::validate_theta},
        numerical_stability::transformations::{
            LOGIT_CLAMP, POSITIVE_FLOOR, safe_logistic, safe_softmax, safe_softmax_deriv,
            safe_softplus, safe_softplus_inv,
        },
    },
};
use ndarray::{Array1, s};

/// Scale applied to the sum of squared residuals.
pub const RESIDUAL_SCALE: f64 = 100.0;

/// Windowed target: window-local coordinates and the matching values.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedTarget {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

/// Scaled squared-residual cost of a mixture layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureObjective {
    layout: MixtureLayout,
}

impl MixtureObjective {
    pub fn new(layout: MixtureLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &MixtureLayout {
        &self.layout
    }

    /// Map unconstrained θ to layout parameters and the full weight vector.
    pub fn to_params(&self, theta: &Theta) -> (Vec<f64>, Array1<f64>) {
        let offset = self.layout.fraction_offset();
        let k = self.layout.n_components();
        let mut params: Vec<f64> =
            theta.slice(s![..offset]).iter().map(|&t| POSITIVE_FLOOR + safe_softplus(t)).collect();
        let mut weights = Array1::zeros(k);
        safe_softmax(theta.slice(s![offset..]), weights.view_mut());
        params.extend(weights.iter().take(k - 1));
        (params, weights)
    }

    /// Map layout parameters to θ. Fractions become logits relative to the
    /// implied last weight, clamped to `±LOGIT_CLAMP`.
    pub fn to_theta(&self, params: &[f64]) -> Theta {
        let offset = self.layout.fraction_offset();
        let fractions = &params[offset..];
        let last = (1.0 - fractions.iter().sum::<f64>()).max(f64::MIN_POSITIVE);
        params[..offset]
            .iter()
            .map(|&p| safe_softplus_inv((p - POSITIVE_FLOOR).max(f64::MIN_POSITIVE)))
            .chain(fractions.iter().map(|&f| {
                (f.max(f64::MIN_POSITIVE) / last).ln().clamp(-LOGIT_CLAMP, LOGIT_CLAMP)
            }))
            .collect()
    }

    fn residuals(&self, theta: &Theta, data: &WindowedTarget) -> OptResult<Array1<f64>> {
        validate_theta(theta, self.layout.len())?;
        let (params, _) = self.to_params(theta);
        let fitted = self
            .layout
            .evaluate(data.x.view(), &params)
            .map_err(|e| OptError::BackendError { text: e.to_string() })?;
        Ok(fitted - &data.y)
    }
}

impl Objective for MixtureObjective {
    type Data = WindowedTarget;

    fn value(&self, theta: &Theta, data: &WindowedTarget) -> OptResult<Cost> {
        let r = self.residuals(theta, data)?;
        Ok(RESIDUAL_SCALE * r.dot(&r))
    }

    fn check(&self, theta: &Theta, data: &WindowedTarget) -> OptResult<()> {
        validate_theta(theta, self.layout.len())?;
        if data.x.len() != data.y.len() {
            return Err(OptError::ShapeMismatch {
                expected: vec![data.x.len()],
                found: vec![data.y.len()],
            });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &WindowedTarget) -> OptResult<Grad> {
        validate_theta(theta, self.layout.len())?;
        let (params, weights) = self.to_params(theta);
        let (fitted, jac) = self
            .layout
            .evaluate_with_grad(data.x.view(), &params)
            .map_err(|e| OptError::BackendError { text: e.to_string() })?;
        let r = fitted - &data.y;
        // ∂c/∂p for every layout parameter.
        let dp = jac.t().dot(&r) * (2.0 * RESIDUAL_SCALE);

        let offset = self.layout.fraction_offset();
        let mut grad = Array1::zeros(theta.len());
        for i in 0..offset {
            grad[i] = dp[i] * safe_logistic(theta[i]);
        }
        if offset < theta.len() {
            let mut upstream = Array1::zeros(weights.len());
            upstream.slice_mut(s![..weights.len() - 1]).assign(&dp.slice(s![offset..]));
            let dtheta = safe_softmax_deriv(weights.view(), upstream.view());
            grad.slice_mut(s![offset..]).assign(&dtheta);
        }
        Ok(grad)
    }
}
