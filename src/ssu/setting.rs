//! Configuration of the single-sample resolver.
use crate::optimization::{
    basin_hopping::BasinHoppingOptions,
    errors::OptResult,
    minimizer::{LineSearcher, MinimizerOptions, Tolerances},
};

/// Tunable knobs of [`SsuResolver`](crate::ssu::SsuResolver).
///
/// Defaults
/// --------
/// - global stage: 100 hops, stop after 3 hops without improvement,
///   step size 0.5, temperature 1.0, seed 0;
/// - local minimizer: tolerance 1e−8, at most 500 iterations;
/// - final polish: tolerance 1e−100, at most 1000 iterations;
/// - More–Thuente line search, no trace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SsuSetting {
    pub global_maxiter: usize,
    pub global_patience: usize,
    pub final_tolerance: f64,
    pub final_maxiter: usize,
    pub minimizer_tolerance: f64,
    pub minimizer_maxiter: usize,
    pub step_size: f64,
    pub temperature: f64,
    pub seed: u64,
    pub line_searcher: LineSearcher,
    /// Record an iteration trace in the outcome.
    pub record_trace: bool,
    /// Attach argmin's terminal observer (`obs_slog` feature).
    pub verbose: bool,
}

impl Default for SsuSetting {
    fn default() -> Self {
        Self {
            global_maxiter: 100,
            global_patience: 3,
            final_tolerance: 1e-100,
            final_maxiter: 1000,
            minimizer_tolerance: 1e-8,
            minimizer_maxiter: 500,
            step_size: 0.5,
            temperature: 1.0,
            seed: 0,
            line_searcher: LineSearcher::MoreThuente,
            record_trace: false,
            verbose: false,
        }
    }
}

impl SsuSetting {
    /// Check every knob by building the optimizer configurations once.
    ///
    /// # Errors
    /// - Any `OptError` raised by the option constructors.
    pub fn validate(&self) -> OptResult<()> {
        self.basin_options(self.seed)?;
        self.local_options()?;
        self.final_options()?;
        Ok(())
    }

    /// Outer-loop options for one fit, seeded with `seed`.
    pub fn basin_options(&self, seed: u64) -> OptResult<BasinHoppingOptions> {
        BasinHoppingOptions::new(
            self.global_maxiter,
            self.global_patience,
            self.step_size,
            self.temperature,
            seed,
        )
    }

    /// Options of every local minimization inside the global stage.
    pub fn local_options(&self) -> OptResult<MinimizerOptions> {
        let tols = Tolerances::uniform(self.minimizer_tolerance, self.minimizer_maxiter)?;
        MinimizerOptions::new(tols, self.line_searcher, self.verbose, None)
    }

    /// Options of the final polish.
    pub fn final_options(&self) -> OptResult<MinimizerOptions> {
        let tols = Tolerances::uniform(self.final_tolerance, self.final_maxiter)?;
        MinimizerOptions::new(tols, self.line_searcher, self.verbose, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults validate and map onto the optimizer options.
    //
    // Given
    // -----
    // - `SsuSetting::default()` and a copy with zero patience.
    //
    // Expect
    // ------
    // - Defaults validate; polish uses tolerance 1e−100 and 1000 iterations.
    // - Zero patience is rejected.
    fn setting_defaults_and_validation() {
        let s = SsuSetting::default();
        assert!(s.validate().is_ok());
        let polish = s.final_options().expect("final options");
        assert_eq!(polish.tols.tol_grad, Some(1e-100));
        assert_eq!(polish.tols.max_iter, Some(1000));
        let bad = SsuSetting { global_patience: 0, ..SsuSetting::default() };
        assert!(bad.validate().is_err());
    }
}
