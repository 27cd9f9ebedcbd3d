//! Errors for the single-sample resolver.
//!
//! - `DataInvalid` is a per-sample condition; batch fits report it for the
//!   offending sample only.
//! - `NumericalDivergence` is raised only when the objective never reached a
//!   finite value. Divergence after a finite state is a soft stop.
//! - `Cancelled` comes from a hook returning `ControlFlow::Break`.
use crate::{kernels::errors::KernelError, optimization::errors::OptError};
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for single-sample fits.
pub type SsuResult<T> = Result<T, SsuError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SsuError {
    /// Malformed sample input (length mismatch, empty, NaN, no positive mass).
    DataInvalid { reason: String },

    /// The objective never produced a finite value.
    NumericalDivergence { reason: String },

    /// A hook cancelled the fit.
    Cancelled,

    /// Invalid family / component count or kernel evaluation failure.
    Kernel(KernelError),

    /// Optimizer configuration or backend failure.
    Optimization(OptError),
}

impl SsuError {
    pub(crate) fn data_invalid(reason: impl Into<String>) -> Self {
        SsuError::DataInvalid { reason: reason.into() }
    }
}

impl std::error::Error for SsuError {}

impl std::fmt::Display for SsuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SsuError::DataInvalid { reason } => write!(f, "Invalid sample data: {reason}"),
            SsuError::NumericalDivergence { reason } => {
                write!(f, "Fit diverged before reaching a finite state: {reason}")
            }
            SsuError::Cancelled => write!(f, "Fit cancelled by a hook"),
            SsuError::Kernel(err) => write!(f, "Kernel error: {err}"),
            SsuError::Optimization(err) => write!(f, "Optimization error: {err}"),
        }
    }
}

impl From<KernelError> for SsuError {
    fn from(err: KernelError) -> Self {
        SsuError::Kernel(err)
    }
}

impl From<OptError> for SsuError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::Cancelled => SsuError::Cancelled,
            err if err.is_numerical() => SsuError::NumericalDivergence { reason: err.to_string() },
            err => SsuError::Optimization(err),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<SsuError> for PyErr {
    fn from(err: SsuError) -> PyErr {
        match err {
            SsuError::Kernel(inner) => inner.into(),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}
