//! Errors for the multi-sample resolver.
//!
//! Everything here is raised before training starts except `Cancelled`.
//! A NaN loss during training is not an error: the run stops and returns
//! what was recorded so far.
use crate::{kernels::errors::KernelError, optimization::errors::OptError};
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for multi-sample fits.
pub type UdmResult<T> = Result<T, UdmError>;

#[derive(Debug, Clone, PartialEq)]
pub enum UdmError {
    /// Bad settings, component count, or initial parameter shape/values.
    InvalidArgument { reason: String },

    /// A hook cancelled training.
    Cancelled,

    /// Kernel construction failure.
    Kernel(KernelError),

    /// Optimizer configuration failure.
    Optimization(OptError),
}

impl UdmError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        UdmError::InvalidArgument { reason: reason.into() }
    }
}

impl std::error::Error for UdmError {}

impl std::fmt::Display for UdmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UdmError::InvalidArgument { reason } => write!(f, "Invalid argument: {reason}"),
            UdmError::Cancelled => write!(f, "Training cancelled by a hook"),
            UdmError::Kernel(err) => write!(f, "Kernel error: {err}"),
            UdmError::Optimization(err) => write!(f, "Optimization error: {err}"),
        }
    }
}

impl From<KernelError> for UdmError {
    fn from(err: KernelError) -> Self {
        UdmError::Kernel(err)
    }
}

impl From<OptError> for UdmError {
    fn from(err: OptError) -> Self {
        match err {
            OptError::Cancelled => UdmError::Cancelled,
            err => UdmError::Optimization(err),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<UdmError> for PyErr {
    fn from(err: UdmError) -> PyErr {
        match err {
            UdmError::Kernel(inner) => inner.into(),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}
