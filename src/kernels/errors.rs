//! Errors for the distribution kernel library.
//!
//! Kernel errors are raised synchronously by pure functions (layout
//! construction, density evaluation, closed-form statistics) and are never
//! retried. Resolvers wrap them into their own error types.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for kernel-library operations.
pub type KernelResult<T> = Result<T, KernelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Malformed argument: zero components, wrong parameter count,
    /// non-finite or out-of-domain parameter values.
    InvalidArgument { reason: String },

    /// The requested family or statistic is not available.
    NotImplemented { what: String },
}

impl KernelError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        KernelError::InvalidArgument { reason: reason.into() }
    }

    pub(crate) fn not_implemented(what: impl Into<String>) -> Self {
        KernelError::NotImplemented { what: what.into() }
    }
}

impl std::error::Error for KernelError {}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::InvalidArgument { reason } => write!(f, "Invalid argument: {reason}"),
            KernelError::NotImplemented { what } => write!(f, "Not implemented: {what}"),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<KernelError> for PyErr {
    fn from(err: KernelError) -> PyErr {
        match err {
            KernelError::NotImplemented { .. } => {
                pyo3::exceptions::PyNotImplementedError::new_err(err.to_string())
            }
            KernelError::InvalidArgument { .. } => PyValueError::new_err(err.to_string()),
        }
    }
}
