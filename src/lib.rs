//! grain_unmix — grain-size distribution unmixing with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the unmixing resolvers to Python via the `_grain_unmix` extension module.
//! A grain-size distribution is decomposed into a few additive unimodal
//! components, either one sample at a time (SSU) or jointly over a whole
//! dataset with shared end members (UDM).
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`data`, `kernels`, `optimization`,
//!   `ssu`, `udm`) as the public crate surface.
//! - Define `#[pyclass]` wrappers and the `#[pymodule]` initializer for the
//!   `_grain_unmix` Python extension.
//! - Create and register the Python submodules `ssu` and `udm` under
//!   `grain_unmix` so that dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion, and error mapping.
//! - Python-visible types mirror the invariants of their Rust counterparts
//!   (`SsuResolver`, `SsuOutcome`, `UdmResolver`, `UdmOutcome`).
//!
//! Conventions
//! -----------
//! - Class values are on the φ scale throughout.
//! - Errors from core Rust code are propagated as typed errors internally and
//!   converted to `PyErr` values at the PyO3 boundary.
//! - The crate emits `log` records; installing a logger is the caller's job.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on [`ssu::SsuResolver`] and
//!   [`udm::UdmResolver`] and can ignore the items behind the
//!   `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core numerical behavior is covered by unit tests in the inner modules and
//!   by the integration tests under `tests/`.

pub mod data;
pub mod kernels;
pub mod optimization;
pub mod ssu;
pub mod udm;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    kernels::DistributionType,
    ssu::{SsuOutcome, SsuResolver},
    udm::{KernelType, UdmOutcome, UdmResolver},
    utils::{
        build_dataset, build_ssu_setting, build_udm_setting, extract_f64_matrix, extract_f64_vec,
    },
};

/// SSUResolver — Python-facing single-sample resolver.
///
/// Purpose
/// -------
/// Expose [`SsuResolver`] to Python: fit one sample, or every sample of a
/// distribution matrix in parallel.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `SSUResolver(distribution_type="weibull", n_components=2, **setting)`;
/// keyword settings mirror [`ssu::SsuSetting`] and default to its values.
///
/// Notes
/// -----
/// - `rebuild` replaces the family and component count atomically and raises
///   on invalid input.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "grain_unmix.ssu")]
pub struct SSUResolver {
    inner: SsuResolver,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SSUResolver {
    #[new]
    #[pyo3(
        signature = (
            distribution_type = "weibull",
            n_components = 2,
            global_maxiter = None,
            global_patience = None,
            final_tolerance = None,
            final_maxiter = None,
            minimizer_tolerance = None,
            minimizer_maxiter = None,
            step_size = None,
            temperature = None,
            seed = None,
            line_searcher = None,
            record_trace = None,
        ),
        text_signature = "(distribution_type='weibull', n_components=2, /, global_maxiter=100, \
                          global_patience=3, final_tolerance=1e-100, final_maxiter=1000, \
                          minimizer_tolerance=1e-8, minimizer_maxiter=500, step_size=0.5, \
                          temperature=1.0, seed=0, line_searcher='MoreThuente', \
                          record_trace=False)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        distribution_type: &str, n_components: usize, global_maxiter: Option<usize>,
        global_patience: Option<usize>, final_tolerance: Option<f64>,
        final_maxiter: Option<usize>, minimizer_tolerance: Option<f64>,
        minimizer_maxiter: Option<usize>, step_size: Option<f64>, temperature: Option<f64>,
        seed: Option<u64>, line_searcher: Option<&str>, record_trace: Option<bool>,
    ) -> PyResult<Self> {
        let family: DistributionType = distribution_type.parse()?;
        let setting = build_ssu_setting(
            global_maxiter,
            global_patience,
            final_tolerance,
            final_maxiter,
            minimizer_tolerance,
            minimizer_maxiter,
            step_size,
            temperature,
            seed,
            line_searcher,
            record_trace,
        )?;
        Ok(SSUResolver { inner: SsuResolver::new(family, n_components, setting)? })
    }

    #[pyo3(text_signature = "(self, distribution_type, n_components)")]
    pub fn rebuild(&mut self, distribution_type: &str, n_components: usize) -> PyResult<()> {
        let family: DistributionType = distribution_type.parse()?;
        self.inner.rebuild(family, n_components)?;
        Ok(())
    }

    #[getter]
    pub fn distribution_type(&self) -> String {
        self.inner.family().to_string()
    }

    #[getter]
    pub fn n_components(&self) -> usize {
        self.inner.n_components()
    }

    /// Parameter names of the current layout, in vector order.
    #[getter]
    pub fn parameter_names(&self) -> Vec<String> {
        self.inner.layout().params().iter().map(|p| p.name.clone()).collect()
    }

    #[pyo3(
        signature = (classes, distribution, name = "sample"),
        text_signature = "(self, classes, distribution, /, name='sample')"
    )]
    pub fn try_fit<'py>(
        &self, py: Python<'py>, classes: &Bound<'py, PyAny>, distribution: &Bound<'py, PyAny>,
        name: &str,
    ) -> PyResult<SSUResult> {
        let x = extract_f64_vec(py, classes, "classes")?;
        let y = extract_f64_vec(py, distribution, "distribution")?;
        let inner = py.allow_threads(|| self.inner.try_fit(name, &x, &y))?;
        Ok(SSUResult { inner })
    }

    /// Fit every row of `distributions` in parallel. Failed samples come
    /// back as `None` and are logged.
    #[pyo3(
        signature = (classes, distributions, names = None),
        text_signature = "(self, classes, distributions, /, names=None)"
    )]
    pub fn try_fit_dataset<'py>(
        &self, py: Python<'py>, classes: &Bound<'py, PyAny>, distributions: &Bound<'py, PyAny>,
        names: Option<Vec<String>>,
    ) -> PyResult<Vec<Option<SSUResult>>> {
        let dataset = build_dataset(py, classes, distributions, names)?;
        let results = py.allow_threads(|| self.inner.try_fit_dataset(&dataset));
        Ok(results
            .into_iter()
            .zip(dataset.sample_names())
            .map(|(res, name)| match res {
                Ok(inner) => Some(SSUResult { inner }),
                Err(err) => {
                    log::warn!("sample '{name}' failed: {err}");
                    None
                }
            })
            .collect())
    }
}

/// SSUResult — read-only view of one single-sample fit.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "grain_unmix.ssu")]
pub struct SSUResult {
    pub inner: SsuOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SSUResult {
    #[getter]
    pub fn name(&self) -> String {
        self.inner.name.clone()
    }

    #[getter]
    pub fn distribution_type(&self) -> String {
        self.inner.distribution_type.to_string()
    }

    #[getter]
    pub fn n_components(&self) -> usize {
        self.inner.n_components
    }

    #[getter]
    pub fn parameters(&self) -> Vec<f64> {
        self.inner.params.clone()
    }

    #[getter]
    pub fn loss(&self) -> f64 {
        self.inner.loss
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    pub fn n_hops(&self) -> usize {
        self.inner.hops
    }

    /// `(start, end)` of the valid window on the sample axis.
    #[getter]
    pub fn window(&self) -> (usize, usize) {
        (self.inner.window.start, self.inner.window.end)
    }

    #[getter]
    pub fn classes<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.real_x.clone().into_pyarray(py)
    }

    #[getter]
    pub fn target<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.target.clone().into_pyarray(py)
    }

    #[getter]
    pub fn fitted<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.fitted.clone().into_pyarray(py)
    }

    #[getter]
    pub fn component_curves(&self) -> Vec<Vec<f64>> {
        self.inner.component_curves.clone()
    }

    #[getter]
    pub fn fractions(&self) -> Vec<f64> {
        self.inner.components.iter().map(|c| c.fraction).collect()
    }

    #[getter]
    pub fn means(&self) -> Vec<f64> {
        self.inner.means()
    }

    /// One `(name, shape, scale, fraction, mean, median, mode, std, skewness,
    /// kurtosis)` tuple per component, ascending mean.
    #[getter]
    #[allow(clippy::type_complexity)]
    pub fn components(&self) -> Vec<(String, f64, f64, f64, f64, f64, f64, f64, f64, f64)> {
        self.inner
            .components
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    c.shape,
                    c.scale,
                    c.fraction,
                    c.mean,
                    c.median,
                    c.mode,
                    c.standard_deviation,
                    c.skewness,
                    c.kurtosis,
                )
            })
            .collect()
    }

    /// `(stage, iteration, cost)` triples when tracing was enabled.
    #[getter]
    pub fn trace(&self) -> Option<Vec<(String, u64, f64)>> {
        self.inner.trace.as_ref().map(|points| {
            points.iter().map(|p| (format!("{:?}", p.stage), p.iteration, p.cost)).collect()
        })
    }
}

/// UDMResolver — Python-facing multi-sample resolver.
///
/// Purpose
/// -------
/// Expose [`UdmResolver`] to Python. Settings are fixed at construction;
/// each `try_fit` call trains from scratch.
///
/// Parameters
/// ----------
/// `UDMResolver(**setting)`; keyword settings mirror [`udm::UdmSetting`].
#[cfg(feature = "python-bindings")]
#[pyclass(module = "grain_unmix.udm")]
pub struct UDMResolver {
    inner: UdmResolver,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl UDMResolver {
    #[new]
    #[pyo3(
        signature = (
            pretrain_epochs = None,
            min_epochs = None,
            max_epochs = None,
            precision = None,
            learning_rate = None,
            betas = None,
            constraint_level = None,
            sharing = None,
            history_stride = None,
        ),
        text_signature = "(/, pretrain_epochs=50, min_epochs=200, max_epochs=2000, precision=6.0, \
                          learning_rate=0.05, betas=(0.8, 0.5), constraint_level=2.0, \
                          sharing='per_sample', history_stride=1)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pretrain_epochs: Option<usize>, min_epochs: Option<usize>, max_epochs: Option<usize>,
        precision: Option<f64>, learning_rate: Option<f64>, betas: Option<(f64, f64)>,
        constraint_level: Option<f64>, sharing: Option<&str>, history_stride: Option<usize>,
    ) -> PyResult<Self> {
        let setting = build_udm_setting(
            pretrain_epochs,
            min_epochs,
            max_epochs,
            precision,
            learning_rate,
            betas,
            constraint_level,
            sharing,
            history_stride,
        )?;
        Ok(UDMResolver { inner: UdmResolver::new(setting)? })
    }

    #[pyo3(
        signature = (classes, distributions, kernel_type = "normal", n_components = 3, names = None, parameters = None),
        text_signature = "(self, classes, distributions, /, kernel_type='normal', n_components=3, \
                          names=None, parameters=None)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn try_fit<'py>(
        &self, py: Python<'py>, classes: &Bound<'py, PyAny>, distributions: &Bound<'py, PyAny>,
        kernel_type: &str, n_components: usize, names: Option<Vec<String>>,
        parameters: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<UDMResult> {
        let dataset = build_dataset(py, classes, distributions, names)?;
        let kernel: KernelType = kernel_type.parse()?;
        let params = parameters.map(|p| extract_f64_matrix(p, "parameters")).transpose()?;
        let inner = py.allow_threads(|| {
            self.inner.try_fit(&dataset, kernel, n_components, params.as_ref())
        })?;
        Ok(UDMResult { inner })
    }
}

/// UDMResult — read-only view of one multi-sample fit.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "grain_unmix.udm")]
pub struct UDMResult {
    pub inner: UdmOutcome,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl UDMResult {
    #[getter]
    pub fn sample_names(&self) -> Vec<String> {
        self.inner.sample_names.clone()
    }

    #[getter]
    pub fn n_components(&self) -> usize {
        self.inner.n_components
    }

    #[getter]
    pub fn kernel_type(&self) -> String {
        self.inner.kernel_name.clone()
    }

    #[getter]
    pub fn parameter_names(&self) -> Vec<String> {
        self.inner.param_names.clone()
    }

    #[getter]
    pub fn component_matrix<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.component_matrix.clone().into_pyarray(py)
    }

    #[getter]
    pub fn component_curves<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f64>> {
        self.inner.component_curves.clone().into_pyarray(py)
    }

    #[getter]
    pub fn proportions<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.proportions.clone().into_pyarray(py)
    }

    #[getter]
    pub fn parameters<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f64>> {
        self.inner.final_params.clone().into_pyarray(py)
    }

    #[getter]
    pub fn distribution_loss(&self) -> Vec<f64> {
        self.inner.distribution_loss.clone()
    }

    #[getter]
    pub fn component_loss(&self) -> Vec<f64> {
        self.inner.component_loss.clone()
    }

    #[getter]
    pub fn n_iterations(&self) -> usize {
        self.inner.n_iterations
    }

    /// Wall-clock training time in seconds.
    #[getter]
    pub fn time_spent(&self) -> f64 {
        self.inner.time_spent.as_secs_f64()
    }

    #[getter]
    pub fn stop_reason(&self) -> String {
        format!("{:?}", self.inner.stop_reason)
    }

    #[getter]
    pub fn history_length(&self) -> usize {
        self.inner.history.len()
    }

    /// Raw kernel parameters and proportion logits of history entry `index`.
    #[pyo3(text_signature = "(self, index)")]
    pub fn history_entry<'py>(
        &self, py: Python<'py>, index: usize,
    ) -> PyResult<(Bound<'py, PyArray3<f64>>, Bound<'py, PyArray2<f64>>)> {
        let snap = self.inner.history.get(index).ok_or_else(|| {
            pyo3::exceptions::PyIndexError::new_err(format!(
                "history index {index} out of range ({} entries)",
                self.inner.history.len()
            ))
        })?;
        Ok((
            snap.component_params.clone().into_pyarray(py),
            snap.proportion_logits.clone().into_pyarray(py),
        ))
    }
}

/// _grain_unmix — PyO3 module initializer for the Python extension.
///
/// Purpose
/// -------
/// Define the `_grain_unmix` Python module and register its submodules used
/// by the public `grain_unmix` package.
///
/// Key behaviors
/// -------------
/// - Create `ssu` and `udm` submodules and attach them to the parent module.
/// - Register the submodules in `sys.modules` so they are importable via
///   dotted paths from Python.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating submodules or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _grain_unmix<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let ssu_mod = PyModule::new(_py, "ssu")?;
    let udm_mod = PyModule::new(_py, "udm")?;
    ssu_module(_py, m, &ssu_mod)?;
    udm_module(_py, m, &udm_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("grain_unmix.ssu", ssu_mod)?;
    _py.import("sys")?.getattr("modules")?.set_item("grain_unmix.udm", udm_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn ssu_module<'py>(
    _py: Python, grain_unmix: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<SSUResolver>()?;
    m.add_class::<SSUResult>()?;
    grain_unmix.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn udm_module<'py>(
    _py: Python, grain_unmix: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<UDMResolver>()?;
    m.add_class::<UDMResult>()?;
    grain_unmix.add_submodule(m)?;
    Ok(())
}
