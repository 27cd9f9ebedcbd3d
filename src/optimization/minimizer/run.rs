//! Execution helper that runs an `argmin` solver on an [`Objective`] and
//! returns a crate-friendly [`MinimizeOutcome`].
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        adapter::ArgMinAdapter,
        observer::IterationRelay,
        traits::{MinimizeOutcome, MinimizerOptions, Objective},
        types::{LbfgsState, Theta},
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{
    Executor, State, TerminationReason, TerminationStatus, observers::ObserverMode,
};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an `argmin` solver on an adapted objective.
///
/// Wires up the problem, the solver, the initial point, the optional
/// iteration relay and the iteration cap, executes, and converts the final
/// state into a [`MinimizeOutcome`].
///
/// # Feature flags
/// With `obs_slog` and `opts.verbose == true`, a terminal slog observer is
/// attached and the starting cost is logged before the first iteration.
///
/// # Errors
/// - Any `argmin` runtime error (cost error, relay cancellation) converted
///   through `From<argmin::core::Error>`.
/// - `OptError::SolverExit` when the solver terminates with
///   `TerminationReason::SolverExit`, which L-BFGS uses for line-search
///   breakdowns such as a non-finite trial cost.
/// - Validation errors from [`MinimizeOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MinimizerOptions, problem: ArgMinAdapter<'a, F>, solver: S,
    relay: Option<IterationRelay>,
) -> OptResult<MinimizeOutcome>
where
    F: Objective,
    S: argmin::core::Solver<ArgMinAdapter<'a, F>, LbfgsState> + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver).configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, ObserverMode::Always);
    }
    if let Some(relay) = relay {
        optimizer = optimizer.add_observer(relay, ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    if let TerminationStatus::Terminated(TerminationReason::SolverExit(text)) = &termination {
        return Err(OptError::SolverExit { text: text.clone() });
    }
    let grad = result.take_gradient();
    MinimizeOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let c0 = problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    log::debug!(
        "init: cost(theta0) = {:.6}{}",
        c0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
