//! resolver — joint decomposition of a whole dataset.
//!
//! Purpose
//! -------
//! Fit one set of end-member curves and per-sample proportions to every
//! sample of a dataset with Adam, following a two-phase schedule.
//!
//! Key behaviors
//! -------------
//! - Pretrain: `pretrain_epochs` steps on the proportions only, loss
//!   `log10(MSE)`, component loss recorded as `0`.
//! - Main: up to `max_epochs` steps on both groups, loss
//!   `log10(MSE) + 10^constraint_level · D`; the recorded component loss is
//!   the weighted term.
//! - Early stop, checked after each main epoch `e > min_epochs`: mean of
//!   the distribution-loss series over `[-100, -80)` minus the mean over
//!   `[-20:]` (slices of the full series, empty slice → no stop) below
//!   `10^(−precision)`.
//! - A NaN loss logs a warning and ends training before the iteration is
//!   recorded. The parameters of the last recorded step are kept.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each group has its own Adam state; a frozen group is not stepped.
//! - Settings, component count and initial parameters are all checked
//!   before the first step.
use crate::{
    data::GrainSizeDataset,
    optimization::adam::Adam,
    udm::{
        errors::{UdmError, UdmResult},
        hooks::{EpochReport, NoHooks, TrainingPhase, UdmHooks},
        kernel::{ClassAxis, ComponentKernel, FamilyKernel, KernelType, validate_initial_params},
        model::{UdmModel, UdmSnapshot},
        outcome::{StopReason, UdmOutcome},
        setting::{ComponentSharing, UdmSetting},
    },
};
use ndarray::{Array2, Array3, Axis, s};
use std::time::Instant;

/// Schedule state between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pretrain { epoch: usize },
    Main { epoch: usize },
    Done(StopReason),
}

impl Phase {
    fn start(setting: &UdmSetting) -> Self {
        if setting.pretrain_epochs > 0 {
            Phase::Pretrain { epoch: 0 }
        } else {
            Self::main_or_done(setting)
        }
    }

    fn main_or_done(setting: &UdmSetting) -> Self {
        if setting.max_epochs > 0 {
            Phase::Main { epoch: 0 }
        } else {
            Phase::Done(StopReason::MaxEpochs)
        }
    }

    fn advance(self, setting: &UdmSetting, distribution_loss: &[f64]) -> Self {
        match self {
            Phase::Pretrain { epoch } if epoch + 1 < setting.pretrain_epochs => {
                Phase::Pretrain { epoch: epoch + 1 }
            }
            Phase::Pretrain { .. } => Self::main_or_done(setting),
            Phase::Main { epoch }
                if epoch > setting.min_epochs
                    && loss_plateaued(distribution_loss, setting.stop_threshold()) =>
            {
                Phase::Done(StopReason::Converged)
            }
            Phase::Main { epoch } if epoch + 1 < setting.max_epochs => {
                Phase::Main { epoch: epoch + 1 }
            }
            Phase::Main { .. } => Phase::Done(StopReason::MaxEpochs),
            done @ Phase::Done(_) => done,
        }
    }
}

/// Mean of `series[len−from .. len−to]`, clamped at the start like a
/// negative slice; `NaN` when empty.
fn tail_mean(series: &[f64], from: usize, to: usize) -> f64 {
    let n = series.len();
    let window = &series[n.saturating_sub(from)..n.saturating_sub(to)];
    if window.is_empty() {
        return f64::NAN;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// `mean(series[-100:-80]) − mean(series[-20:]) < threshold`.
pub(crate) fn loss_plateaued(series: &[f64], threshold: f64) -> bool {
    let delta = tail_mean(series, 100, 80) - tail_mean(series, 20, 0);
    delta < threshold
}

/// Multi-sample joint resolver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UdmResolver {
    setting: UdmSetting,
}

impl UdmResolver {
    /// # Errors
    /// - See [`UdmSetting::validate`].
    pub fn new(setting: UdmSetting) -> UdmResult<Self> {
        setting.validate()?;
        Ok(Self { setting })
    }

    pub fn setting(&self) -> &UdmSetting {
        &self.setting
    }

    /// Fit `dataset` with a built-in kernel.
    ///
    /// `params`, when given, are natural initial kernel parameters,
    /// `n_components × n_params`.
    ///
    /// # Errors
    /// - `UdmError::InvalidArgument` for `n_components == 0` or a bad
    ///   parameter shape.
    /// - `UdmError::Kernel` for initial values outside the family domain.
    pub fn try_fit(
        &self, dataset: &GrainSizeDataset, kernel_type: KernelType, n_components: usize,
        params: Option<&Array2<f64>>,
    ) -> UdmResult<UdmOutcome> {
        let kernel = FamilyKernel::new(kernel_type);
        self.try_fit_with_kernel(dataset, &kernel, n_components, params, &NoHooks)
    }

    /// Fit `dataset` with any [`ComponentKernel`], reporting every recorded
    /// iteration to `hooks`.
    ///
    /// # Errors
    /// - As [`try_fit`](Self::try_fit), plus `UdmError::Cancelled` when a
    ///   hook returns `Break`.
    pub fn try_fit_with_kernel<K, H>(
        &self, dataset: &GrainSizeDataset, kernel: &K, n_components: usize,
        params: Option<&Array2<f64>>, hooks: &H,
    ) -> UdmResult<UdmOutcome>
    where
        K: ComponentKernel + ?Sized,
        H: UdmHooks + ?Sized,
    {
        if n_components == 0 {
            return Err(UdmError::invalid("n_components must be at least 1"));
        }
        let s = &self.setting;
        let axis = ClassAxis::new(dataset.classes());
        let initial_raw = match params {
            Some(p) => validate_initial_params(kernel, p, n_components)?,
            None => {
                let init = kernel.initial_params(&axis, n_components);
                validate_initial_params(kernel, &init, n_components)?
            }
        };
        let adam = s.adam_options()?;
        let target = dataset.distribution_matrix();
        let mut model = UdmModel::new(kernel, axis, dataset.n_samples(), s.sharing, &initial_raw);
        let mut proportion_adam = Adam::new(&model.logits, adam);
        let mut component_adam = Adam::new(&model.component_raw, adam);
        let penalty = s.penalty_weight();

        log::debug!(
            "UDM: {} samples, {} classes, {} x {} ({:?})",
            dataset.n_samples(),
            dataset.n_classes(),
            n_components,
            kernel.name(),
            s.sharing
        );

        let start = Instant::now();
        let mut distribution_loss: Vec<f64> = Vec::new();
        let mut component_loss: Vec<f64> = Vec::new();
        let mut history: Vec<UdmSnapshot> = Vec::new();
        let mut iteration = 0usize;
        let mut phase = Phase::start(s);

        let stop_reason = loop {
            let (training_phase, epoch) = match phase {
                Phase::Pretrain { epoch } => (TrainingPhase::Pretrain, epoch),
                Phase::Main { epoch } => (TrainingPhase::Main, epoch),
                Phase::Done(reason) => break reason,
            };
            let main = training_phase == TrainingPhase::Main;

            let fw = model.forward(target.view());
            let dist = fw.distribution_loss();
            let comp = if main { penalty * fw.divergence } else { 0.0 };
            if (dist + comp).is_nan() {
                log::warn!("Loss is NaN, training terminated.");
                break StopReason::NanLoss;
            }
            distribution_loss.push(dist);
            component_loss.push(comp);

            let grads = model.gradients(&fw, target.view(), main.then_some(penalty));
            proportion_adam.step(&mut model.logits, &grads.logits)?;
            if main {
                component_adam.step(&mut model.component_raw, &grads.components)?;
            }
            if iteration % s.history_stride == 0 {
                history.push(model.snapshot());
            }

            let report = EpochReport {
                phase: training_phase,
                epoch,
                iteration,
                distribution_loss: dist,
                component_loss: comp,
            };
            iteration += 1;
            if hooks.on_epoch(&report).is_break() {
                return Err(UdmError::Cancelled);
            }
            phase = phase.advance(s, &distribution_loss);
        };

        let time_spent = start.elapsed();
        log::info!(
            "UDM finished after {iteration} iterations ({stop_reason:?}) in {:.3}s, loss {:.4}",
            time_spent.as_secs_f64(),
            distribution_loss.last().copied().unwrap_or(f64::NAN)
        );

        let fw = model.forward(target.view());
        let n_samples = dataset.n_samples();
        let (_, _, n_classes) = fw.curves.dim();
        let mut component_curves = Array3::zeros((n_samples, n_components, n_classes));
        for sample in 0..n_samples {
            let r = match s.sharing {
                ComponentSharing::PerSample => sample,
                ComponentSharing::Shared => 0,
            };
            component_curves.slice_mut(s![sample, .., ..]).assign(&fw.curves.slice(s![r, .., ..]));
        }
        let component_matrix = component_curves
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array2::zeros((n_components, n_classes)));

        Ok(UdmOutcome {
            sample_names: dataset.sample_names(),
            classes: dataset.classes().clone(),
            n_components,
            kernel_name: kernel.name(),
            kernel_type: kernel.kernel_type(),
            param_names: kernel.param_names(),
            initial_params: params.cloned(),
            component_matrix,
            component_curves,
            proportions: fw.proportions,
            final_params: model.natural_params(),
            distribution_loss,
            component_loss,
            n_iterations: iteration,
            stop_reason,
            time_spent,
            setting: s.clone(),
            history,
        })
    }
}
