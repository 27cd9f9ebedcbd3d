//! Errors raised while building size classes, samples and datasets.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for data-model construction.
pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    // ---- Size classes ----
    /// At least two classes are required.
    TooFewClasses { n: usize },

    /// A class value is NaN/±inf (or a micron value is not > 0).
    InvalidClassValue { index: usize, value: f64 },

    /// Class values must be strictly increasing or strictly decreasing.
    NonMonotonicClasses { index: usize },

    // ---- Samples ----
    /// A distribution value is NaN/±inf.
    NonFiniteValue { sample: String, index: usize, value: f64 },

    /// A distribution value is negative.
    NegativeValue { sample: String, index: usize, value: f64 },

    /// Sample length differs from the class count.
    LengthMismatch { sample: String, expected: usize, found: usize },

    // ---- Dataset ----
    /// A dataset needs at least one sample.
    EmptyDataset,
}

impl std::error::Error for DataError {}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::TooFewClasses { n } => {
                write!(f, "At least two size classes are required, got {n}")
            }
            DataError::InvalidClassValue { index, value } => {
                write!(f, "Invalid size class value at index {index}: {value}")
            }
            DataError::NonMonotonicClasses { index } => {
                write!(f, "Size classes are not strictly monotonic at index {index}")
            }
            DataError::NonFiniteValue { sample, index, value } => {
                write!(f, "Sample '{sample}' has a non-finite value at index {index}: {value}")
            }
            DataError::NegativeValue { sample, index, value } => {
                write!(f, "Sample '{sample}' has a negative value at index {index}: {value}")
            }
            DataError::LengthMismatch { sample, expected, found } => {
                write!(f, "Sample '{sample}' has {found} values, expected {expected}")
            }
            DataError::EmptyDataset => write!(f, "Dataset has no samples"),
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<DataError> for PyErr {
    fn from(err: DataError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
