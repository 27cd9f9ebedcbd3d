//! minimizer — argmin-powered L-BFGS minimizer for unconstrained costs.
//!
//! Purpose
//! -------
//! Provide the local minimizer used by the single-sample resolver (both as
//! the inner step of basin hopping and as the final polish). Callers
//! implement a single trait, [`Objective`], and invoke [`minimize`] or
//! [`minimize_observed`] to run L-BFGS with a configurable line search,
//! tolerances and finite-difference fallbacks.
//!
//! Key behaviors
//! -------------
//! - Convert user costs into Argmin problems via [`adapter::ArgMinAdapter`].
//! - Select an L-BFGS solver via [`builders`] based on [`LineSearcher`].
//! - Execute via [`run::run_lbfgs`] and normalize results into a
//!   [`MinimizeOutcome`].
//! - Relay iterations to caller callbacks through [`observer::IterationRelay`]
//!   and recover the best finite point after a solver failure.
//!
//! Invariants & assumptions
//! ------------------------
//! - The minimizer works in an unconstrained space; bounded problems are
//!   reparameterized by the caller before they get here.
//! - [`Objective::value`] and [`Objective::grad`] report invalid inputs as
//!   [`OptError`](crate::optimization::errors::OptError) values, never panics.
//!
//! Testing notes
//! -------------
//! - Unit tests cover tolerance validation, solver construction, the FD
//!   fallback, cancellation, and the soft-stop path.
//! - The SSU integration tests exercise the minimizer on real mixture fits.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod observer;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::{minimize, minimize_observed};
pub use self::observer::{BestPoint, IterationCallback, IterationReport};
pub use self::traits::{LineSearcher, MinimizeOutcome, MinimizerOptions, Objective, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::{minimize, minimize_observed};
    pub use super::observer::{IterationCallback, IterationReport};
    pub use super::traits::{LineSearcher, MinimizeOutcome, MinimizerOptions, Objective, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
