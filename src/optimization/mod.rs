//! optimization — minimizers, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for mixture fitting: an
//! Argmin-backed L-BFGS minimizer, a basin-hopping global search around it,
//! an Adam optimizer for the gradient-descent resolver, numerically stable
//! parameter transforms, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - [`minimizer`]: minimize a cost `c(θ)` over unconstrained `θ`, with
//!   per-iteration relays, cancellation and soft stops.
//! - [`basin_hopping`]: seeded Metropolis hopping between local minima.
//! - [`adam`]: bias-corrected Adam over arbitrary-dimensional arrays.
//! - [`numerical_stability`]: softplus/logistic/softmax transforms that map
//!   unconstrained coordinates into positive reals and simplices.
//! - [`errors`]: `OptError` / `OptResult<T>` for configuration issues,
//!   numerical failures and backend solver errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained parameter space; bounds and
//!   simplex constraints are handled by reparameterization in the resolvers.
//! - Invalid states are reported as `OptError`, not panics.
//!
//! Conventions
//! -----------
//! - Parameters and gradients are `ndarray` arrays (`Theta`, `Grad`).
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - Logging goes through the `log` facade only; installing a logger is the
//!   application's job.

pub mod adam;
pub mod basin_hopping;
pub mod errors;
pub mod minimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use grain_unmix::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::adam::{Adam, AdamOptions};
    pub use super::basin_hopping::{BasinHoppingOptions, BasinHoppingOutcome, HopReport};
    pub use super::errors::{OptError, OptResult};
    pub use super::minimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
