//! ssu — single-sample unmixing.
//!
//! Purpose
//! -------
//! Decompose one grain-size distribution into a mixture of `k` components
//! of one family (see [`crate::kernels`]).
//!
//! Key behaviors
//! -------------
//! - [`SsuResolver`] validates the sample, locates its valid window, runs a
//!   seeded basin-hopping search with L-BFGS local steps, and polishes the
//!   best point.
//! - [`SsuOutcome`] reports components in ascending-mean order with their
//!   statistics mapped back onto the real class axis.
//! - [`SsuHooks`] observe every stage and may cancel.
//!
//! Conventions
//! -----------
//! - Fitting uses window-local coordinates `1..=n`; reported shape/scale
//!   parameters are in those units.
//! - Fractions live in `[0, 1]` and the implied last fraction closes the
//!   sum to one.
pub mod errors;
pub mod hooks;
pub mod objective;
pub mod outcome;
pub mod resolver;
pub mod setting;
pub mod window;

pub use self::errors::{SsuError, SsuResult};
pub use self::hooks::{NoHooks, SsuHooks};
pub use self::objective::{MixtureObjective, WindowedTarget};
pub use self::outcome::{ComponentSummary, FitStage, SsuOutcome, TracePoint};
pub use self::resolver::SsuResolver;
pub use self::setting::SsuSetting;
pub use self::window::{ValidWindow, WindowMap, validate_input};
