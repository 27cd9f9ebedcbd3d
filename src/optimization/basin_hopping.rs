//! basin_hopping — stochastic global search around the local minimizer.
//!
//! Purpose
//! -------
//! Escape poor local minima of multimodal mixture costs by repeatedly
//! perturbing the current local minimum, re-minimizing, and accepting the
//! new minimum with a Metropolis criterion.
//!
//! Key behaviors
//! -------------
//! - Start with a local minimization from `theta0`.
//! - Each hop perturbs every coordinate by `U(−step_size, step_size)`, runs
//!   [`minimize_observed`], and accepts downhill moves always and uphill
//!   moves with probability `exp(−Δ / temperature)`.
//! - Stop after `max_hops` hops, or once the best cost has not improved for
//!   `patience` consecutive hops.
//! - A hop callback runs after every hop and may cancel the search.
//!
//! Invariants & assumptions
//! ------------------------
//! - The RNG is a seeded `StdRng`, so a given seed reproduces the same search.
//! - Hops whose local run cannot reach any finite point are rejected and
//!   count towards `patience`; they never abort the search.
//! - Cancellation from either the local relay or the hop callback surfaces
//!   as `OptError::Cancelled`.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{IterationCallback, MinimizerOptions, Objective, Theta, minimize_observed},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};
use std::ops::ControlFlow;

/// Outer-loop configuration for [`basin_hopping`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasinHoppingOptions {
    /// Maximum number of hops after the initial local minimization.
    pub max_hops: usize,
    /// Consecutive hops without a new best before stopping.
    pub patience: usize,
    /// Half-width of the uniform perturbation.
    pub step_size: f64,
    /// Metropolis temperature.
    pub temperature: f64,
    /// RNG seed.
    pub seed: u64,
}

impl BasinHoppingOptions {
    /// Validated constructor.
    ///
    /// # Errors
    /// - `OptError::InvalidMaxIter` if `max_hops` or `patience` is zero.
    /// - `OptError::InvalidStepSize` if `step_size` or `temperature` is not
    ///   finite and positive.
    pub fn new(
        max_hops: usize, patience: usize, step_size: f64, temperature: f64, seed: u64,
    ) -> OptResult<Self> {
        if max_hops == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: max_hops,
                reason: "Basin hopping needs at least one hop.",
            });
        }
        if patience == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: patience,
                reason: "Basin hopping patience must be greater than zero.",
            });
        }
        for value in [step_size, temperature] {
            if !value.is_finite() || value <= 0.0 {
                return Err(OptError::InvalidStepSize {
                    value,
                    reason: "Step size and temperature must be finite and positive.",
                });
            }
        }
        Ok(Self { max_hops, patience, step_size, temperature, seed })
    }
}

impl Default for BasinHoppingOptions {
    fn default() -> Self {
        Self { max_hops: 100, patience: 3, step_size: 0.5, temperature: 1.0, seed: 0 }
    }
}

/// Progress passed to the hop callback.
#[derive(Debug, Clone, PartialEq)]
pub struct HopReport {
    /// 1-based hop index.
    pub hop: usize,
    pub max_hops: usize,
    /// Cost of the hop's local minimum (`NaN` if the hop failed).
    pub trial_cost: f64,
    /// Cost of the currently accepted state.
    pub current_cost: f64,
    pub best_cost: f64,
    pub accepted: bool,
}

/// Result of a basin-hopping search.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinHoppingOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    /// Hops actually performed.
    pub hops: usize,
    /// Hops whose trial minimum was accepted.
    pub accepted: usize,
    /// `true` if the search ended through `patience` rather than `max_hops`.
    pub stalled: bool,
}

/// Metropolis acceptance: accept with probability `min(1, exp(log_accept))`.
fn metropolis_accept(log_accept: f64, u: f64) -> bool {
    u.ln() < log_accept
}

/// Run basin hopping from `theta0`.
///
/// Parameters
/// ----------
/// - `f`, `data`: objective and its payload.
/// - `theta0`: starting point of the first local minimization.
/// - `opts`: outer-loop configuration.
/// - `local`: options for every local minimization.
/// - `local_callback`: relayed to every local run.
/// - `on_hop`: called after each hop; `Break` cancels.
///
/// Errors
/// ------
/// - Any error of the initial local minimization.
/// - `OptError::Cancelled` on cancellation.
pub fn basin_hopping<F, H>(
    f: &F, theta0: Theta, data: &F::Data, opts: &BasinHoppingOptions, local: &MinimizerOptions,
    local_callback: Option<IterationCallback>, mut on_hop: H,
) -> OptResult<BasinHoppingOutcome>
where
    F: Objective,
    H: FnMut(&HopReport) -> ControlFlow<()>,
{
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let jitter = Uniform::new(-opts.step_size, opts.step_size).map_err(|_| {
        OptError::InvalidStepSize { value: opts.step_size, reason: "Empty perturbation range." }
    })?;

    let first = minimize_observed(f, theta0, data, local, local_callback.clone())?;
    let (mut current, mut current_cost) = (first.theta_hat.clone(), first.value);
    let (mut best, mut best_cost) = (first.theta_hat, first.value);
    let mut accepted_hops = 0;
    let mut stale = 0;
    let mut hops = 0;

    while hops < opts.max_hops {
        hops += 1;
        let trial_start = current.mapv(|v| v + jitter.sample(&mut rng));
        let trial = match minimize_observed(f, trial_start, data, local, local_callback.clone()) {
            Ok(outcome) => Some(outcome),
            Err(OptError::Cancelled) => return Err(OptError::Cancelled),
            Err(err) => {
                log::debug!("basin hop {hops} rejected: {err}");
                None
            }
        };

        let u: f64 = rng.random();
        let mut accepted = false;
        let mut trial_cost = f64::NAN;
        let mut improved = false;
        if let Some(trial) = trial {
            trial_cost = trial.value;
            let log_accept = -(trial.value - current_cost) / opts.temperature;
            if trial.value <= current_cost || metropolis_accept(log_accept, u) {
                accepted = true;
                accepted_hops += 1;
                current = trial.theta_hat.clone();
                current_cost = trial.value;
            }
            if trial.value < best_cost {
                best = trial.theta_hat;
                best_cost = trial.value;
                improved = true;
            }
        }
        stale = if improved { 0 } else { stale + 1 };

        let report = HopReport {
            hop: hops,
            max_hops: opts.max_hops,
            trial_cost,
            current_cost,
            best_cost,
            accepted,
        };
        if on_hop(&report).is_break() {
            return Err(OptError::Cancelled);
        }
        if stale >= opts.patience {
            log::debug!("basin hopping stalled after {hops} hops (best cost {best_cost:.6e})");
            return Ok(BasinHoppingOutcome {
                theta_hat: best,
                value: best_cost,
                hops,
                accepted: accepted_hops,
                stalled: true,
            });
        }
    }

    Ok(BasinHoppingOutcome {
        theta_hat: best,
        value: best_cost,
        hops,
        accepted: accepted_hops,
        stalled: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::minimizer::{Cost, Grad};
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Option validation.
    // - Escaping a shallow local minimum of a 1-D double well.
    // - Patience-based stopping and hop-callback cancellation.
    // -------------------------------------------------------------------------

    /// Tilted double well: local minimum near x = +1, global near x = −1.
    struct DoubleWell;

    impl Objective for DoubleWell {
        type Data = ();
        fn value(&self, t: &Theta, _: &()) -> OptResult<Cost> {
            let x = t[0];
            Ok((x * x - 1.0).powi(2) + 0.3 * x)
        }
        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
        fn grad(&self, t: &Theta, _: &()) -> OptResult<Grad> {
            let x = t[0];
            Ok(array![4.0 * x * (x * x - 1.0) + 0.3])
        }
    }

    #[test]
    // Purpose
    // -------
    // Invalid outer-loop settings are rejected.
    //
    // Given
    // -----
    // - Zero hops, zero patience, non-positive step and temperature.
    //
    // Expect
    // ------
    // - Each constructor call fails.
    fn options_validate_inputs() {
        assert!(BasinHoppingOptions::new(0, 3, 0.5, 1.0, 0).is_err());
        assert!(BasinHoppingOptions::new(10, 0, 0.5, 1.0, 0).is_err());
        assert!(BasinHoppingOptions::new(10, 3, 0.0, 1.0, 0).is_err());
        assert!(BasinHoppingOptions::new(10, 3, 0.5, f64::NAN, 0).is_err());
        assert!(BasinHoppingOptions::new(10, 3, 0.5, 1.0, 0).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Hopping finds the deeper well from a start in the shallow one.
    //
    // Given
    // -----
    // - `DoubleWell` from x = 1.2, step size 1.5, generous patience.
    //
    // Expect
    // ------
    // - The best point lies in the left well (x < 0).
    fn basin_hopping_escapes_shallow_minimum() {
        let opts = BasinHoppingOptions::new(60, 30, 1.5, 1.0, 7).expect("options");
        let out = basin_hopping(
            &DoubleWell,
            array![1.2],
            &(),
            &opts,
            &MinimizerOptions::default(),
            None,
            |_| ControlFlow::Continue(()),
        )
        .expect("search");
        assert!(out.theta_hat[0] < 0.0, "expected the global well, got {}", out.theta_hat[0]);
    }

    #[test]
    // Purpose
    // -------
    // Patience ends the search early and the hop callback can cancel it.
    //
    // Given
    // -----
    // - A convex-looking start with patience 2 and a large hop budget.
    // - A callback breaking at hop 1.
    //
    // Expect
    // ------
    // - The first run stops with `stalled == true` well before 500 hops.
    // - The second run returns `OptError::Cancelled`.
    fn basin_hopping_stops_on_patience_and_cancellation() {
        let opts = BasinHoppingOptions::new(500, 2, 0.1, 1e-3, 1).expect("options");
        let out = basin_hopping(
            &DoubleWell,
            array![-1.0],
            &(),
            &opts,
            &MinimizerOptions::default(),
            None,
            |_| ControlFlow::Continue(()),
        )
        .expect("search");
        assert!(out.stalled);
        assert!(out.hops < 500);

        let cancelled = basin_hopping(
            &DoubleWell,
            array![-1.0],
            &(),
            &opts,
            &MinimizerOptions::default(),
            None,
            |r| if r.hop == 1 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) },
        );
        assert_eq!(cancelled, Err(OptError::Cancelled));
    }
}
