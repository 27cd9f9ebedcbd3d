//! Size-class axis shared by every sample of a dataset.
use crate::data::errors::{DataError, DataResult};
use ndarray::Array1;

/// Ordered, strictly monotonic class values on the phi scale, with the
/// derived micron scale `μm = 1000 · 2^(−φ)`.
///
/// Invariants
/// ----------
/// - At least two classes, all finite.
/// - Strictly increasing or strictly decreasing.
/// - Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeClasses {
    phi: Array1<f64>,
    microns: Array1<f64>,
}

impl SizeClasses {
    /// Build from phi values.
    ///
    /// # Errors
    /// - `DataError::TooFewClasses`, `DataError::InvalidClassValue`,
    ///   `DataError::NonMonotonicClasses`.
    pub fn from_phi(phi: Vec<f64>) -> DataResult<Self> {
        if phi.len() < 2 {
            return Err(DataError::TooFewClasses { n: phi.len() });
        }
        if let Some((index, &value)) = phi.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DataError::InvalidClassValue { index, value });
        }
        let ascending = phi[1] > phi[0];
        for (i, w) in phi.windows(2).enumerate() {
            let ok = if ascending { w[1] > w[0] } else { w[1] < w[0] };
            if !ok {
                return Err(DataError::NonMonotonicClasses { index: i + 1 });
            }
        }
        let phi = Array1::from(phi);
        let microns = phi.mapv(|p| 1000.0 * (-p).exp2());
        Ok(Self { phi, microns })
    }

    /// Build from micron values (`φ = −log2(μm / 1000)`).
    ///
    /// # Errors
    /// - `DataError::InvalidClassValue` for non-finite or non-positive
    ///   microns, plus everything [`from_phi`](Self::from_phi) checks.
    pub fn from_microns(microns: Vec<f64>) -> DataResult<Self> {
        if let Some((index, &value)) =
            microns.iter().enumerate().find(|(_, v)| !v.is_finite() || **v <= 0.0)
        {
            return Err(DataError::InvalidClassValue { index, value });
        }
        Self::from_phi(microns.iter().map(|um| -(um / 1000.0).log2()).collect())
    }

    /// `n` classes evenly spaced in phi between `phi_start` and `phi_end`.
    ///
    /// # Errors
    /// - As [`from_phi`](Self::from_phi).
    pub fn linspace_phi(phi_start: f64, phi_end: f64, n: usize) -> DataResult<Self> {
        Self::from_phi(Array1::linspace(phi_start, phi_end, n).to_vec())
    }

    pub fn phi(&self) -> &Array1<f64> {
        &self.phi
    }

    pub fn microns(&self) -> &Array1<f64> {
        &self.microns
    }

    pub fn len(&self) -> usize {
        self.phi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phi.is_empty()
    }

    /// Mean spacing `|φ₀ − φ_last| / (n − 1)`.
    pub fn interval(&self) -> f64 {
        let n = self.phi.len();
        (self.phi[0] - self.phi[n - 1]).abs() / (n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Phi/micron conversion and validation.
    //
    // Given
    // -----
    // - Phi classes [0, 1, 2, 3]; a non-monotonic axis; a single class.
    //
    // Expect
    // ------
    // - Microns [1000, 500, 250, 125], interval 1; errors otherwise.
    fn size_classes_convert_and_validate() {
        let classes = SizeClasses::from_phi(vec![0.0, 1.0, 2.0, 3.0]).expect("classes");
        for (um, expected) in classes.microns().iter().zip([1000.0, 500.0, 250.0, 125.0]) {
            assert_relative_eq!(*um, expected, max_relative = 1e-12);
        }
        assert_relative_eq!(classes.interval(), 1.0);
        let back = SizeClasses::from_microns(classes.microns().to_vec()).expect("classes");
        for (a, b) in back.phi().iter().zip(classes.phi().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }

        assert_eq!(
            SizeClasses::from_phi(vec![0.0, 1.0, 1.0]),
            Err(DataError::NonMonotonicClasses { index: 2 })
        );
        assert_eq!(SizeClasses::from_phi(vec![1.0]), Err(DataError::TooFewClasses { n: 1 }));
        assert!(SizeClasses::from_microns(vec![10.0, -1.0]).is_err());
        assert!(SizeClasses::from_phi(vec![3.0, 2.0, 1.0]).is_ok());
    }
}
