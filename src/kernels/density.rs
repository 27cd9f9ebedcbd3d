//! density — single-component densities with analytic parameter gradients.
//!
//! Purpose
//! -------
//! Evaluate one parametric component `f(x; θ)` and its gradient with respect
//! to θ. Both resolvers build on these: the single-sample resolver through
//! the mixture layout, the multi-sample resolver through its component
//! kernels.
//!
//! Key behaviors
//! -------------
//! - [`ComponentDensity::new`] validates a parameter slice once; evaluation
//!   afterwards is infallible.
//! - Densities are computed in log space and exponentiated at the end.
//! - Outside the support (`x ≤ 0` for Weibull, `x ≤ loc` for
//!   GeneralWeibull) density and gradient are exactly zero.
//!
//! Conventions
//! -----------
//! - Parameter order follows [`DistributionType::param_names`].
//! - Gradients are of the density itself, `∂f/∂θ = f · ∂ln f/∂θ`.
use crate::kernels::{
    errors::{KernelError, KernelResult},
    family::DistributionType,
};
use statrs::function::erf::erfc;
use std::f64::consts::{LN_2, SQRT_2};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// A validated single component, ready for repeated evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentDensity {
    family: DistributionType,
    params: [f64; 3],
}

impl ComponentDensity {
    /// Validate `params` for `family`.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` if the slice length does not match
    ///   the family, a value is non-finite, a scale is not strictly positive,
    ///   or a Weibull shape is not strictly positive.
    pub fn new(family: DistributionType, params: &[f64]) -> KernelResult<Self> {
        let n = family.n_params();
        if params.len() != n {
            return Err(KernelError::invalid(format!(
                "{family} expects {n} parameters, got {}",
                params.len()
            )));
        }
        if let Some((i, v)) = params.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(KernelError::invalid(format!(
                "{family} parameter '{}' must be finite, got {v}",
                family.param_names()[i]
            )));
        }
        let positive: &[usize] = match family {
            DistributionType::Normal | DistributionType::SkewNormal => &[1],
            DistributionType::Weibull => &[0, 1],
            DistributionType::GeneralWeibull => &[0, 2],
        };
        for &i in positive {
            if params[i] <= 0.0 {
                return Err(KernelError::invalid(format!(
                    "{family} parameter '{}' must be > 0, got {}",
                    family.param_names()[i],
                    params[i]
                )));
            }
        }
        let mut buf = [0.0; 3];
        buf[..n].copy_from_slice(params);
        Ok(Self { family, params: buf })
    }

    pub fn family(&self) -> DistributionType {
        self.family
    }

    /// Parameters in family order.
    pub fn params(&self) -> &[f64] {
        &self.params[..self.family.n_params()]
    }

    /// `ln f(x)`; `-∞` outside the support.
    pub fn ln_pdf(&self, x: f64) -> f64 {
        let p = &self.params;
        match self.family {
            DistributionType::Normal => {
                let z = (x - p[0]) / p[1];
                -p[1].ln() - LN_SQRT_2PI - 0.5 * z * z
            }
            DistributionType::SkewNormal => {
                let z = (x - p[0]) / p[1];
                let cdf = std_normal_cdf(p[2] * z);
                if cdf <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                LN_2 - p[1].ln() - LN_SQRT_2PI - 0.5 * z * z + cdf.ln()
            }
            DistributionType::Weibull => weibull_ln_pdf(x, p[0], p[1]),
            DistributionType::GeneralWeibull => weibull_ln_pdf(x - p[1], p[0], p[2]),
        }
    }

    /// `f(x)`.
    pub fn pdf(&self, x: f64) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// `f(x)` and `∂f/∂θ` written into `grad` (length = number of parameters).
    ///
    /// # Panics
    /// - If `grad.len()` differs from the family's parameter count.
    pub fn pdf_with_grad(&self, x: f64, grad: &mut [f64]) -> f64 {
        assert_eq!(grad.len(), self.family.n_params(), "gradient buffer length");
        grad.fill(0.0);
        let f = self.pdf(x);
        if f == 0.0 || !f.is_finite() {
            return f;
        }
        let p = &self.params;
        match self.family {
            DistributionType::Normal => {
                let z = (x - p[0]) / p[1];
                grad[0] = f * z / p[1];
                grad[1] = f * (z * z - 1.0) / p[1];
            }
            DistributionType::SkewNormal => {
                let (scale, alpha) = (p[1], p[2]);
                let z = (x - p[0]) / scale;
                let t = alpha * z;
                // Inverse Mills ratio φ(t)/Φ(t).
                let r = (-0.5 * t * t - LN_SQRT_2PI - std_normal_cdf(t).ln()).exp();
                grad[0] = f * (z - alpha * r) / scale;
                grad[1] = f * (z * z - alpha * z * r - 1.0) / scale;
                grad[2] = f * r * z;
            }
            DistributionType::Weibull => {
                let (dk, dl, _) = weibull_ln_grad(x, p[0], p[1]);
                grad[0] = f * dk;
                grad[1] = f * dl;
            }
            DistributionType::GeneralWeibull => {
                let (dk, dl, dy) = weibull_ln_grad(x - p[1], p[0], p[2]);
                grad[0] = f * dk;
                grad[1] = -f * dy;
                grad[2] = f * dl;
            }
        }
        f
    }
}

/// Density of one component; validates `params` on every call.
///
/// # Errors
/// - See [`ComponentDensity::new`].
pub fn pdf(family: DistributionType, x: f64, params: &[f64]) -> KernelResult<f64> {
    Ok(ComponentDensity::new(family, params)?.pdf(x))
}

/// Density and parameter gradient of one component.
///
/// # Errors
/// - See [`ComponentDensity::new`].
pub fn pdf_with_grad(
    family: DistributionType, x: f64, params: &[f64],
) -> KernelResult<(f64, Vec<f64>)> {
    let density = ComponentDensity::new(family, params)?;
    let mut grad = vec![0.0; family.n_params()];
    let f = density.pdf_with_grad(x, &mut grad);
    Ok((f, grad))
}

fn std_normal_cdf(t: f64) -> f64 {
    0.5 * erfc(-t / SQRT_2)
}

fn weibull_ln_pdf(y: f64, k: f64, lambda: f64) -> f64 {
    if y <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let ln_t = (y / lambda).ln();
    k.ln() - lambda.ln() + (k - 1.0) * ln_t - (k * ln_t).exp()
}

/// `(∂ln f/∂k, ∂ln f/∂λ, ∂ln f/∂y)` of the Weibull log-density at `y > 0`.
fn weibull_ln_grad(y: f64, k: f64, lambda: f64) -> (f64, f64, f64) {
    let ln_t = (y / lambda).ln();
    let u = (k * ln_t).exp();
    let dk = 1.0 / k + ln_t - u * ln_t;
    let dl = k / lambda * (u - 1.0);
    let dy = ((k - 1.0) - k * u) / y;
    (dk, dl, dy)
}
