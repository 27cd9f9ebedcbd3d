//! adam — first-order adaptive moment optimizer over `ndarray` buffers.
//!
//! One [`Adam`] instance owns the moment estimates of one parameter group.
//! The multi-sample resolver keeps a separate instance for proportions and
//! for kernel parameters, so freezing a group is simply not stepping it.
use crate::optimization::errors::{OptError, OptResult};
use ndarray::{Array, Dimension, Zip};

/// Hyper-parameters of [`Adam`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdamOptions {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
}

impl AdamOptions {
    /// Validated constructor; `eps` defaults to `1e-8`.
    ///
    /// # Errors
    /// - `OptError::InvalidStepSize` for a non-positive or non-finite
    ///   learning rate.
    /// - `OptError::InvalidMomentum` for betas outside `[0, 1)`.
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64) -> OptResult<Self> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(OptError::InvalidStepSize {
                value: learning_rate,
                reason: "Learning rate must be finite and positive.",
            });
        }
        for beta in [beta1, beta2] {
            if !(0.0..1.0).contains(&beta) {
                return Err(OptError::InvalidMomentum {
                    value: beta,
                    reason: "Momentum coefficients must lie in [0, 1).",
                });
            }
        }
        Ok(Self { learning_rate, beta1, beta2, eps: 1e-8 })
    }
}

impl Default for AdamOptions {
    fn default() -> Self {
        Self { learning_rate: 1e-3, beta1: 0.9, beta2: 0.999, eps: 1e-8 }
    }
}

/// Adam state for one parameter group of dimension `D`.
#[derive(Debug, Clone)]
pub struct Adam<D: Dimension> {
    opts: AdamOptions,
    t: i32,
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Adam<D> {
    /// Fresh state with zero moments shaped like `like`.
    pub fn new(like: &Array<f64, D>, opts: AdamOptions) -> Self {
        Self { opts, t: 0, m: Array::zeros(like.raw_dim()), v: Array::zeros(like.raw_dim()) }
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one bias-corrected Adam update to `params` in place.
    ///
    /// # Errors
    /// - `OptError::ShapeMismatch` if `params`, `grads` and the moment
    ///   buffers disagree in shape. Nothing is updated in that case.
    pub fn step(&mut self, params: &mut Array<f64, D>, grads: &Array<f64, D>) -> OptResult<()> {
        if params.shape() != grads.shape() || params.shape() != self.m.shape() {
            return Err(OptError::ShapeMismatch {
                expected: self.m.shape().to_vec(),
                found: grads.shape().to_vec(),
            });
        }
        self.t = self.t.saturating_add(1);
        let AdamOptions { learning_rate, beta1, beta2, eps } = self.opts;
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        Zip::from(params).and(grads).and(&mut self.m).and(&mut self.v).for_each(|p, &g, m, v| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + eps);
        });
        Ok(())
    }
}
