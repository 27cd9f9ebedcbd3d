//! Samples and datasets.
//!
//! Only minimal ingestion checks live here: finiteness, non-negativity and
//! matching lengths. Normalization to unit mass is the caller's business.
use crate::data::{
    classes::SizeClasses,
    errors::{DataError, DataResult},
};
use ndarray::{Array1, Array2};

/// One named grain-size distribution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    name: String,
    distribution: Array1<f64>,
}

impl Sample {
    /// # Errors
    /// - `DataError::NonFiniteValue` / `DataError::NegativeValue` for the
    ///   first offending entry.
    pub fn new(name: impl Into<String>, distribution: Vec<f64>) -> DataResult<Self> {
        let name = name.into();
        for (index, &value) in distribution.iter().enumerate() {
            if !value.is_finite() {
                return Err(DataError::NonFiniteValue { sample: name, index, value });
            }
            if value < 0.0 {
                return Err(DataError::NegativeValue { sample: name, index, value });
            }
        }
        Ok(Self { name, distribution: Array1::from(distribution) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn distribution(&self) -> &Array1<f64> {
        &self.distribution
    }
}

/// Ordered samples sharing one class axis.
///
/// Invariants
/// ----------
/// - At least one sample.
/// - Every distribution has exactly `classes.len()` entries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrainSizeDataset {
    classes: SizeClasses,
    samples: Vec<Sample>,
}

impl GrainSizeDataset {
    /// # Errors
    /// - `DataError::EmptyDataset` without samples.
    /// - `DataError::LengthMismatch` for the first sample of the wrong length.
    pub fn new(classes: SizeClasses, samples: Vec<Sample>) -> DataResult<Self> {
        if samples.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if let Some(bad) = samples.iter().find(|s| s.distribution.len() != classes.len()) {
            return Err(DataError::LengthMismatch {
                sample: bad.name.clone(),
                expected: classes.len(),
                found: bad.distribution.len(),
            });
        }
        Ok(Self { classes, samples })
    }

    pub fn classes(&self) -> &SizeClasses {
        &self.classes
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn sample_names(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.name.clone()).collect()
    }

    /// Stacked distributions, `n_samples × n_classes`.
    pub fn distribution_matrix(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_samples(), self.n_classes()));
        for (mut row, sample) in out.rows_mut().into_iter().zip(&self.samples) {
            row.assign(&sample.distribution);
        }
        out
    }
}
