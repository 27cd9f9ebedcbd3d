//! High-level entry points for minimizing a user-provided [`Objective`].
//!
//! This selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an [`ArgMinAdapter`] and delegates the run
//! to [`run_lbfgs`]. [`minimize_observed`] additionally relays every
//! iteration to a caller callback and turns numerical failures into a soft
//! stop at the best finite point seen.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        observer::{BestPoint, IterationCallback, IterationRelay},
        run::run_lbfgs,
        traits::{LineSearcher, MinimizeOutcome, MinimizerOptions, Objective},
        types::Theta,
    },
};
use argmin::core::CostFunction;

/// Minimize `c(θ)` with L-BFGS and the line search chosen in `opts`.
///
/// # Errors
/// - Any error from `f.check`, the solver builders, or the solver run,
///   including `OptError::SolverExit` on a line-search breakdown.
///
/// # Example
/// ```
/// use grain_unmix::optimization::errors::OptResult;
/// use grain_unmix::optimization::minimizer::{MinimizerOptions, Objective, Theta, minimize};
/// use ndarray::array;
///
/// struct Bowl;
/// impl Objective for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = minimize(&Bowl, array![0.5, -0.25], &(), &MinimizerOptions::default())?;
/// assert!(out.value < 1e-8);
/// # Ok::<(), grain_unmix::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MinimizerOptions,
) -> OptResult<MinimizeOutcome> {
    f.check(&theta0, data)?;
    dispatch(f, theta0, data, opts, None)
}

/// Minimize `c(θ)` while relaying iterations to `callback`.
///
/// Behavior
/// --------
/// - The starting point is recorded as the initial best point when its cost
///   is finite.
/// - A callback returning `ControlFlow::Break` stops the run with
///   [`OptError::Cancelled`].
/// - Any other failure of the solver run (non-finite cost, a solver exit
///   after a line-search breakdown) returns the best finite point seen so
///   far as a soft stop (`converged == false`). Without any finite point
///   the error propagates.
///
/// # Errors
/// - `OptError::Cancelled` on callback cancellation.
/// - Configuration errors from `f.check` or the solver builders.
/// - Solver errors when no finite point was ever reached.
pub fn minimize_observed<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MinimizerOptions,
    callback: Option<IterationCallback>,
) -> OptResult<MinimizeOutcome> {
    f.check(&theta0, data)?;
    let best = BestPoint::new();
    if let Ok(c0) = ArgMinAdapter::new(f, data).cost(&theta0) {
        best.offer(&theta0, c0);
    }
    let relay = IterationRelay::new(callback, best.clone());
    let result = dispatch(f, theta0, data, opts, Some(relay));
    settle(result, &best)
}

fn dispatch<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MinimizerOptions, relay: Option<IterationRelay>,
) -> OptResult<MinimizeOutcome> {
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver, relay)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver, relay)
        }
    }
}

/// Turn a failed run into a soft stop at the best recorded point.
fn settle(result: OptResult<MinimizeOutcome>, best: &BestPoint) -> OptResult<MinimizeOutcome> {
    let err = match result {
        Ok(outcome) => return Ok(outcome),
        Err(OptError::Cancelled) => return Err(OptError::Cancelled),
        Err(err) => err,
    };
    let Some((theta, value)) = best.get() else {
        return Err(err);
    };
    if err.is_numerical() {
        log::warn!("local minimizer left the finite domain ({err}); keeping best finite point");
    } else {
        log::debug!("local minimizer stopped early ({err}); keeping best finite point");
    }
    MinimizeOutcome::soft_stop(theta, value, 0, &err)
}
