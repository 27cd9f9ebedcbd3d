//! minimizer::observer — per-iteration relay between Argmin and callers.
//!
//! Purpose
//! -------
//! Argmin observers must be `'static`, so they cannot borrow resolver state.
//! [`IterationRelay`] owns shared handles instead: a caller callback that may
//! cancel the run, and a record of the best finite point seen so far that
//! survives a solver error.
//!
//! Key behaviors
//! -------------
//! - After every solver iteration, forward an [`IterationReport`] to the
//!   callback; `ControlFlow::Break` aborts the run with `OptError::Cancelled`.
//! - Keep the best `(θ, cost)` pair in a [`BestPoint`] handle that the caller
//!   can read after `Executor::run` has failed.
use crate::optimization::{
    errors::OptError,
    minimizer::types::{Cost, LbfgsState, Theta},
};
use argmin::core::{Error, KV, State, observers::Observe};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

/// Snapshot handed to iteration callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// 1-based iteration counter of the local solver.
    pub iteration: u64,
    /// Cost at the current iterate.
    pub cost: Cost,
    /// Best cost seen during this solver run.
    pub best_cost: Cost,
    /// Current iterate, in unconstrained coordinates.
    pub theta: Theta,
}

/// Callback invoked once per local-solver iteration.
pub type IterationCallback = Arc<dyn Fn(&IterationReport) -> ControlFlow<()> + Send + Sync>;

/// Shared best-point record.
#[derive(Debug, Clone, Default)]
pub struct BestPoint {
    inner: Arc<Mutex<Option<(Theta, Cost)>>>,
}

impl BestPoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(theta, cost)` if `cost` is finite and improves on the record.
    pub fn offer(&self, theta: &Theta, cost: Cost) {
        if !cost.is_finite() || theta.iter().any(|v| !v.is_finite()) {
            return;
        }
        if let Ok(mut slot) = self.inner.lock() {
            let better = slot.as_ref().is_none_or(|(_, best)| cost < *best);
            if better {
                *slot = Some((theta.clone(), cost));
            }
        }
    }

    /// Current record, if any finite point has been offered.
    pub fn get(&self) -> Option<(Theta, Cost)> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Argmin observer forwarding iterations to an optional callback.
pub struct IterationRelay {
    callback: Option<IterationCallback>,
    best: BestPoint,
}

impl IterationRelay {
    pub fn new(callback: Option<IterationCallback>, best: BestPoint) -> Self {
        Self { callback, best }
    }
}

impl Observe<LbfgsState> for IterationRelay {
    fn observe_iter(&mut self, state: &LbfgsState, _kv: &KV) -> Result<(), Error> {
        let Some(theta) = state.get_param() else {
            return Ok(());
        };
        let cost = state.get_cost();
        self.best.offer(theta, cost);
        if let Some(callback) = &self.callback {
            let report = IterationReport {
                iteration: state.get_iter(),
                cost,
                best_cost: state.get_best_cost(),
                theta: theta.clone(),
            };
            if callback(&report).is_break() {
                return Err(OptError::Cancelled.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `BestPoint` keeps the lowest finite cost only.
    //
    // Given
    // -----
    // - Offers with costs 2.0, NaN, 1.0, 3.0.
    //
    // Expect
    // ------
    // - The record holds the point offered with cost 1.0.
    fn best_point_keeps_lowest_finite_cost() {
        let best = BestPoint::new();
        best.offer(&array![0.0], 2.0);
        best.offer(&array![9.0], f64::NAN);
        best.offer(&array![1.0], 1.0);
        best.offer(&array![5.0], 3.0);
        let (theta, cost) = best.get().expect("record present");
        assert_eq!(theta, array![1.0]);
        assert_eq!(cost, 1.0);
    }
}
