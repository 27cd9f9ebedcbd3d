//! Integration tests for multi-sample unmixing.
//!
//! Purpose
//! -------
//! - Validate the UDM training schedule end to end: pretraining, the main
//!   phase, early stopping, NaN termination and history bookkeeping.
//! - Exercise both built-in kernels and custom `ComponentKernel`
//!   implementations through the public API.
//!
//! Coverage
//! --------
//! - `udm::resolver`: phase lengths, stop reasons, history stride.
//! - `udm::kernel`: the custom-kernel seam.
//! - `udm::outcome`: shapes and series invariants.
//!
//! Exclusions
//! ----------
//! - Gradient correctness of the model and kernels; unit tests cover it.
//! - Python bindings.
use grain_unmix::{
    data::{GrainSizeDataset, Sample, SizeClasses},
    udm::{
        ClassAxis, ComponentKernel, ComponentSharing, KernelType, NoHooks, StopReason, UdmError,
        UdmResolver, UdmResult, UdmSetting,
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use std::sync::atomic::{AtomicUsize, Ordering};

const N_CLASSES: usize = 60;

/// Normal density on φ.
fn normal(x: f64, loc: f64, scale: f64) -> f64 {
    let z = (x - loc) / scale;
    (-0.5 * z * z).exp() / (scale * (2.0 * std::f64::consts::PI).sqrt())
}

/// Purpose
/// -------
/// Build a dataset of `n_samples` mixtures of three Normal end members on
/// 60 classes over φ ∈ [0, 12].
///
/// Invariants
/// ----------
/// - Proportions vary smoothly with the sample index and sum to one.
/// - Every row is a proper histogram (times the class interval).
fn end_member_dataset(n_samples: usize) -> GrainSizeDataset {
    let classes = SizeClasses::linspace_phi(0.0, 12.0, N_CLASSES).expect("classes");
    let interval = classes.interval();
    let members = [(3.0, 0.8), (6.0, 1.0), (9.0, 1.2)];
    let samples = (0..n_samples)
        .map(|s| {
            let t = s as f64 / n_samples.max(2) as f64;
            let raw = [1.0 - t, 0.5 + 0.5 * t, 0.2 + t];
            let total: f64 = raw.iter().sum();
            let y: Vec<f64> = classes
                .phi()
                .iter()
                .map(|&x| {
                    members
                        .iter()
                        .zip(raw.iter())
                        .map(|(&(m, sd), &w)| w / total * normal(x, m, sd) * interval)
                        .sum()
                })
                .collect();
            Sample::new(format!("S{}", s + 1), y).expect("sample")
        })
        .collect();
    GrainSizeDataset::new(classes, samples).expect("dataset")
}

/// One-parameter custom kernel: `curve = level · bump`, with a fixed bump.
/// Optionally returns NaN from the `poison_at`-th evaluation on, or keeps
/// the curve constant (zero Jacobian).
struct BumpKernel {
    constant: bool,
    poison_at: Option<usize>,
    calls: AtomicUsize,
}

impl BumpKernel {
    fn new(constant: bool, poison_at: Option<usize>) -> Self {
        Self { constant, poison_at, calls: AtomicUsize::new(0) }
    }
}

impl ComponentKernel for BumpKernel {
    fn name(&self) -> String {
        "Bump".to_string()
    }

    fn param_names(&self) -> Vec<String> {
        vec!["level".to_string()]
    }

    fn initial_params(&self, _axis: &ClassAxis, n_components: usize) -> Array2<f64> {
        Array2::from_elem((n_components, 1), 0.5)
    }

    fn to_raw(&self, params: ArrayView1<f64>) -> UdmResult<Array1<f64>> {
        if params.len() != 1 {
            return Err(UdmError::InvalidArgument { reason: "one parameter".to_string() });
        }
        Ok(params.to_owned())
    }

    fn from_raw(&self, raw: ArrayView1<f64>) -> Array1<f64> {
        raw.to_owned()
    }

    fn curve_with_grad(
        &self, raw: ArrayView1<f64>, axis: &ClassAxis, mut curve: ArrayViewMut1<f64>,
        mut jac: ArrayViewMut2<f64>,
    ) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let poisoned = self.poison_at.is_some_and(|at| call >= at);
        for (c, &x) in axis.phi().iter().enumerate() {
            let bump = normal(x, 6.0, 2.0) * axis.interval();
            if poisoned {
                curve[c] = f64::NAN;
                jac[[c, 0]] = 0.0;
            } else if self.constant {
                curve[c] = bump;
                jac[[c, 0]] = 0.0;
            } else {
                curve[c] = raw[0] * bump;
                jac[[c, 0]] = bump;
            }
        }
    }
}

#[test]
// Purpose
// -------
// Series and history have one entry per recorded iteration.
//
// Given
// -----
// - pretrain 20, max 30 main epochs (too few for early stopping), Normal
//   kernel with k = 3 on 8 samples.
//
// Expect
// ------
// - 50 iterations; loss series and history of length 50.
// - Pretrain component losses exactly 0; main component losses ≥ 0.
// - The distribution loss ends below where it started.
fn history_matches_pretrain_plus_main() {
    let setting =
        UdmSetting { pretrain_epochs: 20, min_epochs: 0, max_epochs: 30, ..UdmSetting::default() };
    let resolver = UdmResolver::new(setting).expect("resolver");
    let dataset = end_member_dataset(8);
    let out = resolver.try_fit(&dataset, KernelType::Normal, 3, None).expect("fit");

    assert_eq!(out.n_iterations, 50);
    assert_eq!(out.distribution_loss.len(), 50);
    assert_eq!(out.component_loss.len(), 50);
    assert_eq!(out.history.len(), 50);
    assert_eq!(out.stop_reason, StopReason::MaxEpochs);
    assert!(out.component_loss[..20].iter().all(|v| *v == 0.0));
    assert!(out.component_loss[20..].iter().all(|v| *v >= 0.0));
    assert!(out.distribution_loss[49] < out.distribution_loss[0]);

    assert_eq!(out.component_matrix.dim(), (3, N_CLASSES));
    assert_eq!(out.component_curves.dim(), (8, 3, N_CLASSES));
    assert_eq!(out.proportions.dim(), (8, 3));
    assert_eq!(out.reconstruction().dim(), (8, N_CLASSES));
    assert_eq!(out.sample_names[0], "S1");
    assert_eq!(out.component_names(), vec!["C1", "C2", "C3"]);
}

#[test]
// Purpose
// -------
// A history stride keeps every N-th iteration and nothing else changes.
//
// Given
// -----
// - The previous schedule with `history_stride = 7` and shared kernel
//   parameters.
//
// Expect
// ------
// - 50 iterations, 8 snapshots (iterations 0, 7, …, 49), each with one
//   parameter row; shared fits report zero divergence throughout.
fn history_stride_decimates() {
    let setting = UdmSetting {
        pretrain_epochs: 20,
        min_epochs: 0,
        max_epochs: 30,
        history_stride: 7,
        sharing: ComponentSharing::Shared,
        ..UdmSetting::default()
    };
    let resolver = UdmResolver::new(setting).expect("resolver");
    let out = resolver.try_fit(&end_member_dataset(5), KernelType::Weibull, 2, None).expect("fit");
    assert_eq!(out.n_iterations, 50);
    assert_eq!(out.history.len(), 8);
    assert_eq!(out.history[0].component_params.dim(), (1, 2, 2));
    assert_eq!(out.history[0].proportion_logits.dim(), (5, 2));
    assert!(out.component_loss.iter().all(|v| *v == 0.0));
    assert_eq!(out.final_params.dim(), (1, 2, 2));
}

#[test]
// Purpose
// -------
// A constant loss triggers the early stop within 100 epochs of the floor.
//
// Given
// -----
// - A kernel whose curve never changes, default pretraining (50),
//   `min_epochs = 20`.
//
// Expect
// ------
// - `Converged` after 31 main epochs: the first main epoch past the floor
//   at which the `[-100, -80)` window is non-empty.
// - Main epochs never exceed `min_epochs + 100`.
fn constant_loss_stops_early() {
    let setting = UdmSetting { min_epochs: 20, ..UdmSetting::default() };
    let resolver = UdmResolver::new(setting.clone()).expect("resolver");
    let kernel = BumpKernel::new(true, None);
    let out = resolver
        .try_fit_with_kernel(&end_member_dataset(6), &kernel, 2, None, &NoHooks)
        .expect("fit");
    let main = out.n_iterations - setting.pretrain_epochs;
    assert_eq!(out.stop_reason, StopReason::Converged);
    assert!(main <= setting.min_epochs + 100);
    assert_eq!(main, 31);
    assert_eq!(out.kernel_name, "Bump");
    assert_eq!(out.kernel_type, None);
}

#[test]
// Purpose
// -------
// A NaN loss at iteration i stops training with exactly i recorded
// iterations, in either phase.
//
// Given
// -----
// - A shared one-component custom kernel (one evaluation per iteration)
//   that turns NaN at evaluation 12 (pretrain) or 57 (main).
//
// Expect
// ------
// - `n_iterations == i`, `history.len() == i`, both series of length i,
//   stop reason `NanLoss`.
fn nan_loss_stops_before_recording() {
    let setting = UdmSetting { sharing: ComponentSharing::Shared, ..UdmSetting::default() };
    let resolver = UdmResolver::new(setting).expect("resolver");
    let dataset = end_member_dataset(4);
    for i in [12, 57] {
        let kernel = BumpKernel::new(false, Some(i));
        let out = resolver
            .try_fit_with_kernel(&dataset, &kernel, 1, None, &NoHooks)
            .expect("fit");
        assert_eq!(out.stop_reason, StopReason::NanLoss);
        assert_eq!(out.n_iterations, i);
        assert_eq!(out.history.len(), i);
        assert_eq!(out.distribution_loss.len(), i);
        assert_eq!(out.component_loss.len(), i);
    }
}

#[test]
// Purpose
// -------
// Explicit initial parameters are used and validated.
//
// Given
// -----
// - Normal kernel, k = 3, with the true end members as initial values,
//   and a matrix with a negative scale.
//
// Expect
// ------
// - The first fit stores the initial matrix and its first snapshot decodes
//   close to it; the second fails before training.
fn explicit_initial_parameters() {
    let setting =
        UdmSetting { pretrain_epochs: 5, min_epochs: 0, max_epochs: 5, ..UdmSetting::default() };
    let resolver = UdmResolver::new(setting).expect("resolver");
    let dataset = end_member_dataset(5);
    let init = ndarray::array![[3.0, 0.8], [6.0, 1.0], [9.0, 1.2]];
    let out = resolver.try_fit(&dataset, KernelType::Normal, 3, Some(&init)).expect("fit");
    assert_eq!(out.initial_params.as_ref(), Some(&init));
    // Pretraining leaves kernel parameters untouched.
    let locs = out.history[4].component_params.slice(ndarray::s![0, .., 0]).to_vec();
    assert_eq!(locs, vec![3.0, 6.0, 9.0]);

    let bad = ndarray::array![[3.0, -0.8], [6.0, 1.0], [9.0, 1.2]];
    assert!(matches!(
        resolver.try_fit(&dataset, KernelType::Normal, 3, Some(&bad)),
        Err(UdmError::Kernel(_))
    ));
}
