//! resolver — single-sample unmixing.
//!
//! Purpose
//! -------
//! Fit one grain-size distribution with a `k`-component mixture of one
//! family, in two stages: basin hopping around L-BFGS from the layout
//! defaults, then a tight local polish from the best global point.
//!
//! Key behaviors
//! -------------
//! - Input is validated first; failures go to
//!   [`SsuHooks::on_data_invalid`] and abort the fit for this sample.
//! - Fitting runs on the valid window in window-local coordinates.
//! - Every local iteration and every hop is reported to the hooks, which
//!   may cancel.
//! - Non-convergence is accepted. Leaving the finite domain keeps the best
//!   finite point; only a fit that never saw a finite cost fails.
//! - [`SsuResolver::try_fit_dataset`] fits all samples of a dataset in
//!   parallel with per-sample seeds `seed + index`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The layout always matches `(family, n_components)`; [`rebuild`]
//!   replaces both or neither.
//! - The resolver holds no mutable state during a fit, so it is `Sync` and
//!   can serve concurrent fits.
//!
//! [`rebuild`]: SsuResolver::rebuild
use crate::{
    data::GrainSizeDataset,
    kernels::{family::DistributionType, layout::MixtureLayout},
    optimization::{
        basin_hopping::{BasinHoppingOutcome, basin_hopping},
        minimizer::{IterationCallback, minimize_observed},
    },
    ssu::{
        errors::{SsuError, SsuResult},
        hooks::{NoHooks, SsuHooks},
        objective::{MixtureObjective, WindowedTarget},
        outcome::{FitRecord, FitStage, SsuOutcome, TracePoint},
        setting::SsuSetting,
        window::{ValidWindow, validate_input},
    },
};
use ndarray::Array1;
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

/// Single-sample mixture resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct SsuResolver {
    layout: MixtureLayout,
    setting: SsuSetting,
}

type Trace = Arc<Mutex<Vec<TracePoint>>>;

impl SsuResolver {
    /// Build a resolver for `family` with `n_components` components.
    ///
    /// # Errors
    /// - `SsuError::Kernel` for `n_components == 0` or a family without a
    ///   two-parameter layout.
    /// - `SsuError::Optimization` for invalid settings.
    pub fn new(
        family: DistributionType, n_components: usize, setting: SsuSetting,
    ) -> SsuResult<Self> {
        setting.validate().map_err(SsuError::Optimization)?;
        let layout = MixtureLayout::new(family, n_components)?;
        Ok(Self { layout, setting })
    }

    /// Switch family and component count. On error the resolver is left
    /// unchanged.
    ///
    /// # Errors
    /// - `SsuError::Kernel` as in [`new`](Self::new).
    pub fn rebuild(&mut self, family: DistributionType, n_components: usize) -> SsuResult<()> {
        self.layout = MixtureLayout::new(family, n_components)?;
        Ok(())
    }

    pub fn family(&self) -> DistributionType {
        self.layout.family()
    }

    pub fn n_components(&self) -> usize {
        self.layout.n_components()
    }

    pub fn layout(&self) -> &MixtureLayout {
        &self.layout
    }

    pub fn setting(&self) -> &SsuSetting {
        &self.setting
    }

    /// Fit one sample without hooks.
    ///
    /// # Errors
    /// - See [`try_fit_with_hooks`](Self::try_fit_with_hooks).
    pub fn try_fit(&self, name: &str, x: &[f64], y: &[f64]) -> SsuResult<SsuOutcome> {
        self.fit_seeded(name, x, y, &Arc::new(NoHooks), self.setting.seed)
    }

    /// Fit one sample, reporting to `hooks`.
    ///
    /// # Errors
    /// - `SsuError::DataInvalid` for malformed input.
    /// - `SsuError::Cancelled` if a hook returned `Break`.
    /// - `SsuError::NumericalDivergence` if no finite cost was ever reached.
    pub fn try_fit_with_hooks<H: SsuHooks + 'static>(
        &self, name: &str, x: &[f64], y: &[f64], hooks: &Arc<H>,
    ) -> SsuResult<SsuOutcome> {
        self.fit_seeded(name, x, y, hooks, self.setting.seed)
    }

    /// Fit every sample of `dataset` in parallel. One result per sample, in
    /// dataset order.
    pub fn try_fit_dataset(&self, dataset: &GrainSizeDataset) -> Vec<SsuResult<SsuOutcome>> {
        self.try_fit_dataset_with_hooks(dataset, &Arc::new(NoHooks))
    }

    /// [`try_fit_dataset`](Self::try_fit_dataset) with shared hooks.
    pub fn try_fit_dataset_with_hooks<H: SsuHooks + 'static>(
        &self, dataset: &GrainSizeDataset, hooks: &Arc<H>,
    ) -> Vec<SsuResult<SsuOutcome>> {
        let x = dataset.classes().phi().to_vec();
        dataset
            .samples()
            .par_iter()
            .enumerate()
            .map(|(i, sample)| {
                let y = sample.distribution().to_vec();
                let seed = self.setting.seed.wrapping_add(i as u64);
                self.fit_seeded(sample.name(), &x, &y, hooks, seed)
            })
            .collect()
    }

    fn fit_seeded<H: SsuHooks + 'static>(
        &self, name: &str, x: &[f64], y: &[f64], hooks: &Arc<H>, seed: u64,
    ) -> SsuResult<SsuOutcome> {
        let window = validate_input(x, y).and_then(|()| ValidWindow::locate(y));
        let window = match window {
            Ok(window) => window,
            Err(err) => {
                let message = err.to_string();
                log::debug!("sample '{name}' rejected: {message}");
                hooks.on_data_invalid(x, y, &message);
                return Err(err);
            }
        };
        hooks.on_data_fed(&window);

        let target =
            WindowedTarget { x: window.local_x(), y: Array1::from(y[window.start..window.end].to_vec()) };
        let objective = MixtureObjective::new(self.layout.clone());
        let theta0 = objective.to_theta(&self.layout.defaults());
        let trace: Option<Trace> = self.setting.record_trace.then(Trace::default);

        let global = self.global_stage(&objective, theta0, &target, hooks, trace.as_ref(), seed)?;
        log::debug!(
            "sample '{name}': global stage finished after {} hops (cost {:.6e})",
            global.hops,
            global.value
        );

        let polish_opts = self.setting.final_options()?;
        let polish = minimize_observed(
            &objective,
            global.theta_hat.clone(),
            &target,
            &polish_opts,
            Some(relay(hooks, trace.as_ref(), FitStage::Polish)),
        )?;
        let (theta, converged) = if polish.value <= global.value {
            (polish.theta_hat, polish.converged)
        } else {
            (global.theta_hat, false)
        };
        let (params, _) = objective.to_params(&theta);

        let record = FitRecord {
            params,
            hops: global.hops,
            converged,
            trace: trace.map(|t| t.lock().map(|v| v.clone()).unwrap_or_default()),
        };
        let outcome = SsuOutcome::build(
            name,
            &self.layout,
            window,
            &x[window.start..window.end],
            &y[window.start..window.end],
            record,
        )?;
        log::info!(
            "sample '{name}': {} x {} fitted, mse {:.3e}",
            self.layout.n_components(),
            self.layout.family(),
            outcome.loss
        );
        Ok(outcome)
    }

    fn global_stage<H: SsuHooks + 'static>(
        &self, objective: &MixtureObjective, theta0: Array1<f64>, target: &WindowedTarget,
        hooks: &Arc<H>, trace: Option<&Trace>, seed: u64,
    ) -> SsuResult<BasinHoppingOutcome> {
        let opts = self.setting.basin_options(seed)?;
        let local = self.setting.local_options()?;
        let local_relay = relay(hooks, trace, FitStage::Local);
        let out = basin_hopping(objective, theta0, target, &opts, &local, Some(local_relay), |r| {
            if let Some(trace) = trace
                && let Ok(mut points) = trace.lock()
            {
                points.push(TracePoint {
                    stage: FitStage::Hop,
                    iteration: r.hop as u64,
                    cost: r.best_cost,
                });
            }
            hooks.global_iteration(r)
        })?;
        Ok(out)
    }
}

/// Local-solver callback forwarding to the hooks and the optional trace.
fn relay<H: SsuHooks + 'static>(
    hooks: &Arc<H>, trace: Option<&Trace>, stage: FitStage,
) -> IterationCallback {
    let hooks = Arc::clone(hooks);
    let trace = trace.cloned();
    Arc::new(move |report| {
        if let Some(trace) = &trace
            && let Ok(mut points) = trace.lock()
        {
            points.push(TracePoint { stage, iteration: report.iteration, cost: report.cost });
        }
        hooks.local_iteration(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::minimizer::IterationReport;
    use std::ops::ControlFlow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction and rebuild error paths.
    // - Data-invalid reporting through hooks.
    // - Cancellation from a local-iteration hook.
    // - A small single-component fit with trace recording.
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct Recorder {
        invalid: AtomicUsize,
        fed: AtomicUsize,
        local: AtomicUsize,
        cancel_local: bool,
    }

    impl SsuHooks for Recorder {
        fn on_data_invalid(&self, _: &[f64], _: &[f64], _: &str) {
            self.invalid.fetch_add(1, Ordering::SeqCst);
        }
        fn on_data_fed(&self, _: &ValidWindow) {
            self.fed.fetch_add(1, Ordering::SeqCst);
        }
        fn local_iteration(&self, _: &IterationReport) -> ControlFlow<()> {
            self.local.fetch_add(1, Ordering::SeqCst);
            if self.cancel_local { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        }
    }

    fn quick_setting() -> SsuSetting {
        SsuSetting {
            global_maxiter: 5,
            global_patience: 2,
            final_maxiter: 200,
            final_tolerance: 1e-12,
            ..SsuSetting::default()
        }
    }

    #[test]
    // Purpose
    // -------
    // `new` and `rebuild` fail loudly and `rebuild` is atomic.
    //
    // Given
    // -----
    // - k = 0, SkewNormal, then a valid rebuild to Normal with k = 3.
    //
    // Expect
    // ------
    // - Kernel errors; a failed rebuild leaves the resolver unchanged.
    fn new_and_rebuild_fail_loudly() {
        assert!(matches!(
            SsuResolver::new(DistributionType::Weibull, 0, SsuSetting::default()),
            Err(SsuError::Kernel(_))
        ));
        let mut r = SsuResolver::new(DistributionType::Weibull, 2, SsuSetting::default())
            .expect("resolver");
        assert!(r.rebuild(DistributionType::SkewNormal, 2).is_err());
        assert_eq!((r.family(), r.n_components()), (DistributionType::Weibull, 2));
        r.rebuild(DistributionType::Normal, 3).expect("rebuild");
        assert_eq!(r.layout().len(), 8);
    }

    #[test]
    // Purpose
    // -------
    // Invalid data is reported to the hook and no fit is attempted.
    //
    // Given
    // -----
    // - y with a NaN, and an all-zero y.
    //
    // Expect
    // ------
    // - `DataInvalid` twice; `on_data_invalid` twice; `on_data_fed` never.
    fn invalid_data_reported_via_hook() {
        let r = SsuResolver::new(DistributionType::Weibull, 1, quick_setting()).expect("resolver");
        let hooks = Arc::new(Recorder::default());
        let x = [1.0, 2.0, 3.0];
        let err = r.try_fit_with_hooks("nan", &x, &[0.1, f64::NAN, 0.2], &hooks);
        assert!(matches!(err, Err(SsuError::DataInvalid { .. })));
        let err = r.try_fit_with_hooks("zero", &x, &[0.0, 0.0, 0.0], &hooks);
        assert!(matches!(err, Err(SsuError::DataInvalid { .. })));
        assert_eq!(hooks.invalid.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.fed.load(Ordering::SeqCst), 0);
    }

    #[test]
    // Purpose
    // -------
    // A local-iteration hook returning `Break` cancels the fit.
    //
    // Given
    // -----
    // - A valid sample and a hook that always breaks.
    //
    // Expect
    // ------
    // - `SsuError::Cancelled` after exactly one local iteration.
    fn local_hook_cancels() {
        let r = SsuResolver::new(DistributionType::Weibull, 1, quick_setting()).expect("resolver");
        let hooks = Arc::new(Recorder { cancel_local: true, ..Recorder::default() });
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = (0..20).map(|i| if i == 0 { 0.0 } else { 1.0 / f64::from(i) }).collect();
        let out = r.try_fit_with_hooks("s", &x, &y, &hooks);
        assert_eq!(out, Err(SsuError::Cancelled));
        assert_eq!(hooks.local.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.fed.load(Ordering::SeqCst), 1);
    }

    #[test]
    // Purpose
    // -------
    // A single Weibull component is recovered and the trace is recorded.
    //
    // Given
    // -----
    // - y = Weibull(k = 2, λ = 6) density on window coordinates 1..=25,
    //   placed after two leading zeros.
    //
    // Expect
    // ------
    // - shape ≈ 2, scale ≈ 6, fraction 1, tiny loss, non-empty trace,
    //   x_offset = 3.
    fn single_component_fit_recovers_parameters() {
        let setting = SsuSetting { record_trace: true, ..quick_setting() };
        let r = SsuResolver::new(DistributionType::Weibull, 1, setting).expect("resolver");
        let density = |t: f64| (2.0 / 6.0) * (t / 6.0) * (-(t / 6.0).powi(2)).exp();
        let mut y = vec![0.0, 0.0];
        y.extend((1..=25).map(|i| density(f64::from(i))));
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64 * 0.25).collect();
        let out = r.try_fit("w", &x, &y).expect("fit");
        let c = &out.components[0];
        assert!((c.shape - 2.0).abs() < 1e-2, "shape {}", c.shape);
        assert!((c.scale - 6.0).abs() < 1e-2, "scale {}", c.scale);
        assert_eq!(c.fraction, 1.0);
        assert_eq!(c.x_offset, 3);
        assert!(out.loss < 1e-10);
        assert!(out.trace.as_ref().is_some_and(|t| !t.is_empty()));
        assert_eq!(out.window, ValidWindow { start: 2, end: 27 });
    }

    #[test]
    // Purpose
    // -------
    // A polish cut short by its iteration cap is not reported as converged.
    //
    // Given
    // -----
    // - The Weibull(2, 6) sample with one iteration per local run and for
    //   the final polish.
    //
    // Expect
    // ------
    // - The fit succeeds with `converged == false`.
    fn capped_polish_is_not_converged() {
        let setting = SsuSetting { final_maxiter: 1, minimizer_maxiter: 1, ..quick_setting() };
        let r = SsuResolver::new(DistributionType::Weibull, 1, setting).expect("resolver");
        let y: Vec<f64> =
            (1..=25).map(|i| f64::from(i) / 18.0 * (-(f64::from(i) / 6.0).powi(2)).exp()).collect();
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64 * 0.25).collect();
        let out = r.try_fit("capped", &x, &y).expect("fit");
        assert!(!out.converged);
        assert!(out.loss.is_finite());
    }
}
