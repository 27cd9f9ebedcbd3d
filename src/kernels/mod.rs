//! kernels — parametric component densities, statistics and mixture layouts.
//!
//! Purpose
//! -------
//! Pure functions shared by both resolvers: single-component densities with
//! analytic parameter gradients, closed-form moment statistics, and the flat
//! parameter layout of a `k`-component mixture.
//!
//! Key behaviors
//! -------------
//! - [`DistributionType`] names the supported families and parses
//!   case-insensitively.
//! - [`ComponentDensity`] validates parameters once and evaluates
//!   `f(x; θ)` and `∂f/∂θ` in log space.
//! - [`ComponentStatistics`] holds mean, median, mode, variance, standard
//!   deviation, skewness and kurtosis in closed form.
//! - [`MixtureLayout`] builds names, defaults, bounds and the fraction
//!   constraint for `(family, k)`, and evaluates the mixture by folding over
//!   its components.
//!
//! Conventions
//! -----------
//! - Errors are [`KernelError`] values; nothing in this module panics on
//!   user input.
//! - No logging: everything here is side-effect free.

pub mod density;
pub mod errors;
pub mod family;
pub mod layout;
pub mod statistics;

pub use self::density::{ComponentDensity, pdf, pdf_with_grad};
pub use self::errors::{KernelError, KernelResult};
pub use self::family::DistributionType;
pub use self::layout::{Bounds, INFINITESIMAL, MixtureComponent, MixtureLayout, ParamRole, ParamSpec};
pub use self::statistics::ComponentStatistics;
