//! Numerical stability utilities.
//!
//! Provides safe implementations of common nonlinear transforms
//! that are prone to overflow/underflow in naïve form.
//! The functions here follow guarded strategies similar to those
//! in major ML libraries (e.g. PyTorch, TensorFlow), using explicit
//! cutoffs (`x > 20.0`) to keep `f64` arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`POSITIVE_FLOOR`]: smallest admissible value of a strictly positive
//!   kernel parameter (shape/scale); mirrors the open lower bound of the
//!   mixture layout.
//! - [`LOGIT_CLAMP`]: symmetric clamp applied to logits recovered from
//!   fractions so that degenerate (0 or 1) weights stay representable.
//! - [`safe_softplus(x)`]: stable version of `ln(1 + exp(x))`,
//!   mapping ℝ → (0, ∞) without overflow.
//! - [`safe_softplus_inv(x)`]: inverse of softplus, mapping
//!   (0, ∞) → ℝ without catastrophic cancellation.
//! - [`safe_logistic(x)`]: derivative of softplus, `1 / (1 + exp(-x))`.
//! - [`safe_softmax`] / [`safe_softmax_deriv`]: max-shifted softmax with an
//!   implicit zero "reference" logit, and its vector–Jacobian product.
//! - [`softmax_row`]: plain max-shifted softmax used for per-sample
//!   proportions.
//!
//! # Rationale
//! These transforms are building blocks in optimization and
//! probabilistic modeling whenever parameters must be kept
//! strictly positive or constrained to a probability simplex.
use ndarray::{Array1, ArrayView1, ArrayViewMut1};

/// Floor added to every softplus-mapped positive parameter.
pub const POSITIVE_FLOOR: f64 = 1e-100;

/// Logits recovered from fractions are clamped to `[-LOGIT_CLAMP, LOGIT_CLAMP]`.
pub const LOGIT_CLAMP: f64 = 30.0;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// Computes softplus without overflow for large positive `x` and
/// with good precision for large negative `x`. This implementation
/// uses a simple piecewise guard:
///
/// - For sufficiently large `x`, `softplus(x) ≈ x + ln1p(exp(-x)) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
///
/// # Parameters
/// - `x`: real input
///
/// # Returns
/// - `softplus(x)` as `f64`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: solves for `t` in
/// `softplus(t) = x`, returning `t = ln(exp(x) - 1)`.
///
/// - For sufficiently large `x`, `ln(exp(x) - 1) ≈ x`.
/// - Otherwise, it uses `ln(expm1(x))`.
///
/// # Parameters
/// - `x`: a positive real (the softplus output), must be finite and `> 0`.
///
/// # Returns
/// - `t` such that `softplus(t) = x`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// This is also `d softplus(x) / dx`, which is how the resolvers use it when
/// chaining gradients through positive parameters.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Max-shifted softmax over `[theta, 0]`.
///
/// Writes `theta.len() + 1` weights into `out`: one per free logit plus a
/// final reference weight whose logit is fixed at zero. All weights are
/// strictly positive and sum to one.
///
/// # Panics
/// - If `out.len() != theta.len() + 1`.
pub fn safe_softmax(theta: ArrayView1<f64>, mut out: ArrayViewMut1<f64>) {
    assert_eq!(out.len(), theta.len() + 1, "softmax output must have one slot per logit plus one");
    let max = theta.iter().copied().fold(0.0_f64, f64::max);
    let n = theta.len();
    let mut denom = (-max).exp();
    for (i, &t) in theta.iter().enumerate() {
        let e = (t - max).exp();
        out[i] = e;
        denom += e;
    }
    out[n] = (-max).exp();
    out.mapv_inplace(|v| v / denom);
}

/// Vector–Jacobian product of [`safe_softmax`].
///
/// Given the softmax weights `w` (length `m + 1`) and an upstream gradient
/// `g = ∂L/∂w`, returns `∂L/∂θ` for the `m` free logits:
/// `∂L/∂θ_i = w_i (g_i − Σ_j w_j g_j)`.
pub fn safe_softmax_deriv(weights: ArrayView1<f64>, upstream: ArrayView1<f64>) -> Array1<f64> {
    let dot: f64 = weights.iter().zip(upstream.iter()).map(|(w, g)| w * g).sum();
    let m = weights.len().saturating_sub(1);
    Array1::from_iter((0..m).map(|i| weights[i] * (upstream[i] - dot)))
}

/// Plain max-shifted softmax of one row of logits, in place.
pub fn softmax_row(mut logits: ArrayViewMut1<f64>) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    logits.mapv_inplace(|v| (v - max).exp());
    let denom = logits.sum();
    logits.mapv_inplace(|v| v / denom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the guarded transforms with naïve formulas on safe grids.
    // - Mass conservation and positivity of the slack softmax.
    // - The softmax vector–Jacobian product against finite differences.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Softplus and its inverse are mutual inverses on a moderate grid.
    //
    // Given
    // -----
    // - Points in [-10, 25].
    //
    // Expect
    // ------
    // - `safe_softplus_inv(safe_softplus(x)) ≈ x`.
    fn softplus_round_trips_on_grid() {
        for i in -10..=25 {
            let x = i as f64;
            assert_relative_eq!(safe_softplus_inv(safe_softplus(x)), x, epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // The logistic helper is the derivative of softplus.
    //
    // Given
    // -----
    // - A handful of points including large magnitudes.
    //
    // Expect
    // ------
    // - Central differences of softplus match `safe_logistic`.
    fn logistic_matches_softplus_derivative() {
        for &x in &[-40.0, -3.0, 0.0, 0.7, 5.0] {
            let h = 1e-6;
            let fd = (safe_softplus(x + h) - safe_softplus(x - h)) / (2.0 * h);
            assert_relative_eq!(safe_logistic(x), fd, epsilon = 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // Softmax with a reference slot sums to one and stays positive.
    //
    // Given
    // -----
    // - Logits with a large positive entry.
    //
    // Expect
    // ------
    // - Weights sum to one, all strictly positive, zero logits give 1/(m+1).
    fn softmax_conserves_mass() {
        let theta = array![800.0, -2.0];
        let mut out = Array1::zeros(3);
        safe_softmax(theta.view(), out.view_mut());
        assert_relative_eq!(out.sum(), 1.0, epsilon = 1e-12);
        assert!(out.iter().all(|w| w.is_finite() && *w >= 0.0));

        let zeros = Array1::zeros(3);
        let mut even = Array1::zeros(4);
        safe_softmax(zeros.view(), even.view_mut());
        for w in even.iter() {
            assert_relative_eq!(*w, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // The softmax VJP agrees with finite differences of a linear functional.
    //
    // Given
    // -----
    // - Logits θ ∈ ℝ² and upstream g ∈ ℝ³, L(θ) = g · softmax(θ).
    //
    // Expect
    // ------
    // - Analytic ∂L/∂θ matches a central difference to 1e-7.
    fn softmax_deriv_matches_finite_differences() {
        let theta = array![0.3, -1.1];
        let g = array![1.5, -0.4, 2.0];
        let loss = |t: &Array1<f64>| {
            let mut w = Array1::zeros(3);
            safe_softmax(t.view(), w.view_mut());
            w.dot(&g)
        };
        let mut w = Array1::zeros(3);
        safe_softmax(theta.view(), w.view_mut());
        let analytic = safe_softmax_deriv(w.view(), g.view());
        for i in 0..2 {
            let h = 1e-6;
            let mut tp = theta.clone();
            let mut tm = theta.clone();
            tp[i] += h;
            tm[i] -= h;
            let fd = (loss(&tp) - loss(&tm)) / (2.0 * h);
            assert_relative_eq!(analytic[i], fd, epsilon = 1e-7);
        }
    }
}
