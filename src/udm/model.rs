//! model — forward pass, losses and gradients of the joint decomposition.
//!
//! Purpose
//! -------
//! Hold the two trainable groups (kernel parameters and proportion
//! logits) and compute the reconstruction, both loss terms and their exact
//! gradients.
//!
//! Key behaviors
//! -------------
//! - Proportions: `p[s] = softmax(z[s])` per sample row.
//! - Curves: `C[r, j] = kernel(raw[r, j])` with `r = s` for per-sample
//!   parameters and `r = 0` for shared ones.
//! - Reconstruction: `X̂[s, c] = Σ_j p[s, j] · C[r(s), j, c]`.
//! - Distribution loss: `log10(mean((X̂ − X)²))`.
//! - Divergence: mean over `(j, c)` of the sample standard deviation
//!   (n − 1 denominator) of `C[·, j, c]`; zero for shared parameters or a
//!   single sample.
//!
//! Invariants
//! ----------
//! - `component_raw` is `R × K × P`, `logits` is `S × K`.
//! - A standard deviation of exactly zero contributes a zero gradient.
use crate::{
    optimization::numerical_stability::transformations::softmax_row,
    udm::{
        kernel::{ClassAxis, ComponentKernel},
        setting::ComponentSharing,
    },
};
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, Axis, s};
use std::f64::consts::LN_10;

/// Trainable values at one point of training.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UdmSnapshot {
    /// Raw kernel parameters, `R × K × P`; map rows through
    /// [`ComponentKernel::from_raw`] for natural values.
    pub component_params: Array3<f64>,
    /// Proportion logits, `S × K`.
    pub proportion_logits: Array2<f64>,
}

/// Result of one forward pass.
#[derive(Debug, Clone)]
pub(crate) struct Forward {
    pub proportions: Array2<f64>,
    pub curves: Array3<f64>,
    pub jacobians: Array4<f64>,
    pub reconstruction: Array2<f64>,
    pub mse: f64,
    pub divergence: f64,
}

impl Forward {
    pub fn distribution_loss(&self) -> f64 {
        self.mse.log10()
    }
}

/// Gradients of the total loss with respect to both groups.
#[derive(Debug, Clone)]
pub(crate) struct Gradients {
    pub components: Array3<f64>,
    pub logits: Array2<f64>,
}

pub(crate) struct UdmModel<'k, K: ComponentKernel + ?Sized> {
    kernel: &'k K,
    axis: ClassAxis,
    sharing: ComponentSharing,
    pub component_raw: Array3<f64>,
    pub logits: Array2<f64>,
}

impl<'k, K: ComponentKernel + ?Sized> UdmModel<'k, K> {
    /// `initial_raw` is `K × P`; it is copied into every parameter row.
    pub fn new(
        kernel: &'k K, axis: ClassAxis, n_samples: usize, sharing: ComponentSharing,
        initial_raw: &Array2<f64>,
    ) -> Self {
        let rows = match sharing {
            ComponentSharing::PerSample => n_samples,
            ComponentSharing::Shared => 1,
        };
        let (k, p) = initial_raw.dim();
        let component_raw = initial_raw
            .broadcast((rows, k, p))
            .map_or_else(|| Array3::zeros((rows, k, p)), |v| v.to_owned());
        Self { kernel, axis, sharing, component_raw, logits: Array2::zeros((n_samples, k)) }
    }

    fn row_of(&self, sample: usize) -> usize {
        match self.sharing {
            ComponentSharing::PerSample => sample,
            ComponentSharing::Shared => 0,
        }
    }

    pub fn snapshot(&self) -> UdmSnapshot {
        UdmSnapshot {
            component_params: self.component_raw.clone(),
            proportion_logits: self.logits.clone(),
        }
    }

    /// Natural kernel parameters, `R × K × P`.
    pub fn natural_params(&self) -> Array3<f64> {
        let (rows, n_components, _) = self.component_raw.dim();
        let mut out = Array3::zeros(self.component_raw.raw_dim());
        for r in 0..rows {
            for j in 0..n_components {
                out.slice_mut(s![r, j, ..])
                    .assign(&self.kernel.from_raw(self.component_raw.slice(s![r, j, ..])));
            }
        }
        out
    }

    pub fn forward(&self, target: ArrayView2<f64>) -> Forward {
        let (n_samples, n_classes) = target.dim();
        let (rows, n_components, n_params) = self.component_raw.dim();

        let mut proportions = self.logits.clone();
        for row in proportions.rows_mut() {
            softmax_row(row);
        }

        let mut curves = Array3::zeros((rows, n_components, n_classes));
        let mut jacobians = Array4::zeros((rows, n_components, n_classes, n_params));
        for r in 0..rows {
            for j in 0..n_components {
                self.kernel.curve_with_grad(
                    self.component_raw.slice(s![r, j, ..]),
                    &self.axis,
                    curves.slice_mut(s![r, j, ..]),
                    jacobians.slice_mut(s![r, j, .., ..]),
                );
            }
        }

        let mut reconstruction = Array2::zeros((n_samples, n_classes));
        for (sample, mut out) in reconstruction.rows_mut().into_iter().enumerate() {
            let r = self.row_of(sample);
            out.assign(&proportions.row(sample).dot(&curves.slice(s![r, .., ..])));
        }

        let residual = &reconstruction - &target;
        let mse = residual.mapv(|v| v * v).mean().unwrap_or(f64::NAN);
        let divergence = self.divergence(&curves);
        Forward { proportions, curves, jacobians, reconstruction, mse, divergence }
    }

    fn divergence(&self, curves: &Array3<f64>) -> f64 {
        let rows = curves.len_of(Axis(0));
        if self.sharing == ComponentSharing::Shared || rows < 2 {
            return 0.0;
        }
        curves.std_axis(Axis(0), 1.0).mean().unwrap_or(0.0)
    }

    /// Gradients of `distribution_loss + penalty · divergence`. Without a
    /// penalty (pretraining) only the distribution loss is differentiated.
    pub fn gradients(
        &self, fw: &Forward, target: ArrayView2<f64>, penalty: Option<f64>,
    ) -> Gradients {
        let (n_samples, n_classes) = target.dim();
        let (rows, n_components, n_params) = self.component_raw.dim();

        // ∂L/∂X̂
        let scale = 2.0 / ((n_samples * n_classes) as f64 * fw.mse * LN_10);
        let upstream = (&fw.reconstruction - &target) * scale;

        let mut logits = Array2::zeros((n_samples, n_components));
        let mut d_curves = Array3::<f64>::zeros((rows, n_components, n_classes));
        for sample in 0..n_samples {
            let r = self.row_of(sample);
            let curves = fw.curves.slice(s![r, .., ..]);
            let g = upstream.row(sample);
            let p = fw.proportions.row(sample);

            let dp: Array1<f64> = curves.dot(&g);
            let pdot = p.dot(&dp);
            logits.row_mut(sample).assign(&(&p * &(dp - pdot)));

            for j in 0..n_components {
                d_curves.slice_mut(s![r, j, ..]).scaled_add(p[j], &g);
            }
        }

        if let Some(weight) = penalty
            && self.sharing == ComponentSharing::PerSample
            && rows >= 2
        {
            let mean = fw
                .curves
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array2::zeros((n_components, n_classes)));
            let std = fw.curves.std_axis(Axis(0), 1.0);
            let coeff = weight / ((n_components * n_classes) as f64 * (rows - 1) as f64);
            for r in 0..rows {
                for j in 0..n_components {
                    for c in 0..n_classes {
                        let sd = std[[j, c]];
                        if sd > 0.0 {
                            d_curves[[r, j, c]] += coeff * (fw.curves[[r, j, c]] - mean[[j, c]]) / sd;
                        }
                    }
                }
            }
        }

        let mut components = Array3::zeros((rows, n_components, n_params));
        for r in 0..rows {
            for j in 0..n_components {
                let jac = fw.jacobians.slice(s![r, j, .., ..]);
                components.slice_mut(s![r, j, ..]).assign(&jac.t().dot(&d_curves.slice(s![r, j, ..])));
            }
        }
        Gradients { components, logits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::SizeClasses,
        udm::kernel::{FamilyKernel, KernelType},
    };
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Forward-pass shapes, proportions on the simplex, divergence rules.
    // - Both gradient groups against finite differences of the total loss.
    // -------------------------------------------------------------------------

    fn setup() -> (FamilyKernel, ClassAxis, Array2<f64>) {
        let classes = SizeClasses::linspace_phi(0.0, 8.0, 33).expect("classes");
        let axis = ClassAxis::new(&classes);
        let kernel = FamilyKernel::new(KernelType::Normal);
        let target = Array2::from_shape_fn((3, 33), |(s, c)| {
            let x = c as f64 * 0.25;
            let m = 2.0 + s as f64;
            0.25 * (-(x - m).powi(2) / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
        });
        (kernel, axis, target)
    }

    fn total_loss<K: ComponentKernel + ?Sized>(
        model: &UdmModel<'_, K>, target: ArrayView2<f64>, weight: f64,
    ) -> f64 {
        let fw = model.forward(target);
        fw.distribution_loss() + weight * fw.divergence
    }

    #[test]
    // Purpose
    // -------
    // Forward pass produces consistent shapes and simplex proportions.
    //
    // Given
    // -----
    // - 3 samples, 2 Normal components, per-sample and shared layouts.
    //
    // Expect
    // ------
    // - Shapes (3×2, R×2×33, 3×33); rows of proportions sum to one.
    // - Identical rows give zero divergence; shared always zero.
    fn forward_shapes_and_divergence() {
        let (kernel, axis, target) = setup();
        let init = kernel.initial_params(&axis, 2);
        let raw = validate(&kernel, &init);
        for sharing in [ComponentSharing::PerSample, ComponentSharing::Shared] {
            let model = UdmModel::new(&kernel, axis.clone(), 3, sharing, &raw);
            let fw = model.forward(target.view());
            assert_eq!(fw.proportions.dim(), (3, 2));
            let rows = if sharing == ComponentSharing::Shared { 1 } else { 3 };
            assert_eq!(fw.curves.dim(), (rows, 2, 33));
            assert_eq!(fw.reconstruction.dim(), (3, 33));
            for row in fw.proportions.rows() {
                assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
            }
            assert_eq!(fw.divergence, 0.0);
            assert!(fw.mse.is_finite() && fw.mse > 0.0);
        }
    }

    fn validate(kernel: &FamilyKernel, init: &Array2<f64>) -> Array2<f64> {
        crate::udm::kernel::validate_initial_params(kernel, init, init.nrows()).expect("raw")
    }

    #[test]
    // Purpose
    // -------
    // Analytic gradients match central differences of the penalized loss.
    //
    // Given
    // -----
    // - Per-sample Normal parameters perturbed per row (non-zero
    //   divergence), non-uniform logits, penalty weight 10.
    //
    // Expect
    // ------
    // - Every logit and raw-parameter gradient within 1e−5 relative.
    fn gradients_match_finite_differences() {
        let (kernel, axis, target) = setup();
        let init = kernel.initial_params(&axis, 2);
        let raw = validate(&kernel, &init);
        let mut model = UdmModel::new(&kernel, axis, 3, ComponentSharing::PerSample, &raw);
        for ((r, j, i), v) in model.component_raw.indexed_iter_mut() {
            *v += 0.05 * (r as f64 + 1.0) * (j as f64 - 0.5) + 0.01 * i as f64;
        }
        for ((s, j), v) in model.logits.indexed_iter_mut() {
            *v = 0.3 * s as f64 - 0.2 * j as f64;
        }
        let weight = 10.0;
        let fw = model.forward(target.view());
        assert!(fw.divergence > 0.0);
        let grads = model.gradients(&fw, target.view(), Some(weight));
        let h = 1e-6;

        for idx in 0..model.logits.len() {
            let (s, j) = (idx / 2, idx % 2);
            let orig = model.logits[[s, j]];
            model.logits[[s, j]] = orig + h;
            let up = total_loss(&model, target.view(), weight);
            model.logits[[s, j]] = orig - h;
            let down = total_loss(&model, target.view(), weight);
            model.logits[[s, j]] = orig;
            let fd = (up - down) / (2.0 * h);
            assert_relative_eq!(grads.logits[[s, j]], fd, max_relative = 1e-5, epsilon = 1e-7);
        }

        let dims = model.component_raw.dim();
        for r in 0..dims.0 {
            for j in 0..dims.1 {
                for i in 0..dims.2 {
                    let orig = model.component_raw[[r, j, i]];
                    model.component_raw[[r, j, i]] = orig + h;
                    let up = total_loss(&model, target.view(), weight);
                    model.component_raw[[r, j, i]] = orig - h;
                    let down = total_loss(&model, target.view(), weight);
                    model.component_raw[[r, j, i]] = orig;
                    assert_relative_eq!(
                        grads.components[[r, j, i]],
                        (up - down) / (2.0 * h),
                        max_relative = 1e-5,
                        epsilon = 1e-7
                    );
                }
            }
        }
    }
}
