//! window — input validation, valid-range detection and the inverse axis map.
//!
//! The valid range `[start, end)` starts at the first strictly positive
//! value and ends at the first exactly-zero value after it; without such a
//! zero the range runs to the end of the sample. Fitting happens on
//! window-local coordinates `1..=end−start`; [`WindowMap`] interpolates
//! those back onto the real class axis.
use crate::ssu::errors::{SsuError, SsuResult};
use ndarray::Array1;

/// Validate raw class values and distribution.
///
/// # Errors
/// - `SsuError::DataInvalid` for empty input, a length mismatch, or any
///   NaN/±inf in either slice.
pub fn validate_input(x: &[f64], y: &[f64]) -> SsuResult<()> {
    if x.is_empty() || y.is_empty() {
        return Err(SsuError::data_invalid("class values and distribution must be non-empty"));
    }
    if x.len() != y.len() {
        return Err(SsuError::data_invalid(format!(
            "class values ({}) and distribution ({}) differ in length",
            x.len(),
            y.len()
        )));
    }
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(SsuError::data_invalid(format!("class value {i} is not finite: {}", x[i])));
    }
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(SsuError::data_invalid(format!("distribution value {i} is not finite: {}", y[i])));
    }
    Ok(())
}

/// Half-open range of sample indices used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidWindow {
    pub start: usize,
    pub end: usize,
}

impl ValidWindow {
    /// Locate the valid range of `y`.
    ///
    /// # Errors
    /// - `SsuError::DataInvalid` if `y` has no strictly positive value.
    pub fn locate(y: &[f64]) -> SsuResult<Self> {
        let start = y
            .iter()
            .position(|&v| v > 0.0)
            .ok_or_else(|| SsuError::data_invalid("distribution has no positive value"))?;
        let end = y[start + 1..]
            .iter()
            .position(|&v| v == 0.0)
            .map_or(y.len(), |offset| start + 1 + offset);
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Window-local fit coordinates `1, 2, …, len`.
    pub fn local_x(&self) -> Array1<f64> {
        Array1::from_iter((1..=self.len()).map(|i| i as f64))
    }
}

/// Piecewise-linear map from window-local coordinates to real class values.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMap {
    real_x: Vec<f64>,
}

impl WindowMap {
    /// `real_x` are the class values inside the window, in order.
    pub fn new(real_x: Vec<f64>) -> Self {
        Self { real_x }
    }

    /// Real class value at window-local coordinate `local`; `NaN` outside
    /// `[1, len]` or for non-finite input.
    pub fn to_real(&self, local: f64) -> f64 {
        let n = self.real_x.len();
        if !local.is_finite() || n == 0 || local < 1.0 || local > n as f64 {
            return f64::NAN;
        }
        let pos = local - 1.0;
        let i = (pos.floor() as usize).min(n - 1);
        if i + 1 >= n {
            return self.real_x[n - 1];
        }
        let frac = pos - i as f64;
        self.real_x[i] + frac * (self.real_x[i + 1] - self.real_x[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // The first-zero rule truncates at the first zero after the first
    // positive value, ignoring later modes.
    //
    // Given
    // -----
    // - `[0, 0, 0, 2, 5, 3, 0, 0, 1, 0]`, a sample without trailing zero,
    //   and an all-zero sample.
    //
    // Expect
    // ------
    // - `start = 3`, `end = 6`; the tail case runs to `len`; all-zero fails.
    fn locate_applies_first_zero_rule() {
        let w = ValidWindow::locate(&[0.0, 0.0, 0.0, 2.0, 5.0, 3.0, 0.0, 0.0, 1.0, 0.0])
            .expect("window");
        assert_eq!(w, ValidWindow { start: 3, end: 6 });
        assert_eq!(w.local_x().to_vec(), vec![1.0, 2.0, 3.0]);

        let tail = ValidWindow::locate(&[0.0, 1.0, 2.0]).expect("window");
        assert_eq!(tail, ValidWindow { start: 1, end: 3 });

        assert!(matches!(ValidWindow::locate(&[0.0, 0.0]), Err(SsuError::DataInvalid { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Interpolation inside the window and NaN outside.
    //
    // Given
    // -----
    // - Real classes [2.0, 2.5, 4.0].
    //
    // Expect
    // ------
    // - 1 → 2.0, 1.5 → 2.25, 3 → 4.0; 0.5 and 3.5 → NaN.
    fn window_map_interpolates() {
        let map = WindowMap::new(vec![2.0, 2.5, 4.0]);
        assert_relative_eq!(map.to_real(1.0), 2.0);
        assert_relative_eq!(map.to_real(1.5), 2.25);
        assert_relative_eq!(map.to_real(2.5), 3.25);
        assert_relative_eq!(map.to_real(3.0), 4.0);
        assert!(map.to_real(0.5).is_nan());
        assert!(map.to_real(3.5).is_nan());
        assert!(map.to_real(f64::NAN).is_nan());
    }

    #[test]
    // Purpose
    // -------
    // Input validation catches each malformed case.
    //
    // Given
    // -----
    // - Empty, mismatched, and NaN-containing inputs.
    //
    // Expect
    // ------
    // - `DataInvalid` each time; well-formed input passes.
    fn validate_input_rejects_malformed() {
        assert!(validate_input(&[], &[]).is_err());
        assert!(validate_input(&[1.0, 2.0], &[1.0]).is_err());
        assert!(validate_input(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
        assert!(validate_input(&[1.0, 2.0], &[f64::NAN, 2.0]).is_err());
        assert!(validate_input(&[1.0, 2.0], &[0.0, 2.0]).is_ok());
    }
}
