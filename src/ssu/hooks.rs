//! Caller hooks for single-sample fits.
//!
//! Hooks are side effects only; the iteration hooks may cancel the fit by
//! returning `ControlFlow::Break`. They are shared with the local solver's
//! observer, hence the `Send + Sync` bound.
use crate::{
    optimization::{basin_hopping::HopReport, minimizer::IterationReport},
    ssu::window::ValidWindow,
};
use std::ops::ControlFlow;

pub trait SsuHooks: Send + Sync {
    /// Input failed validation; the fit is aborted for this sample.
    fn on_data_invalid(&self, _x: &[f64], _y: &[f64], _message: &str) {}

    /// Input passed validation and the valid window is known.
    fn on_data_fed(&self, _window: &ValidWindow) {}

    /// One iteration of a local minimization (global stage or polish).
    fn local_iteration(&self, _report: &IterationReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// One basin-hopping step of the global stage.
    fn global_iteration(&self, _report: &HopReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl SsuHooks for NoHooks {}
