//! udm — multi-sample joint decomposition (end-member mixture analysis).
//!
//! Purpose
//! -------
//! Explain every sample of a dataset as a convex combination of a small
//! number of parametric end-member curves, learning the curves and the
//! per-sample proportions together.
//!
//! Key behaviors
//! -------------
//! - [`UdmResolver`] trains with Adam through a pretrain phase
//!   (proportions only) and a main phase (everything, with a divergence
//!   penalty that ties per-sample curves together).
//! - [`ComponentKernel`] is the extension point for curve shapes;
//!   [`FamilyKernel`] covers the built-in families.
//! - [`UdmOutcome`] carries the loss series and an optional decimated
//!   parameter history.
//!
//! Conventions
//! -----------
//! - Arrays are `S × K × C` (samples, components, classes) and `R × K × P`
//!   for kernel parameters, `R = S` or `R = 1` depending on
//!   [`ComponentSharing`].
pub mod errors;
pub mod hooks;
pub mod kernel;
pub mod model;
pub mod outcome;
pub mod resolver;
pub mod setting;

pub use self::errors::{UdmError, UdmResult};
pub use self::hooks::{EpochReport, NoHooks, TrainingPhase, UdmHooks};
pub use self::kernel::{
    ClassAxis, ComponentKernel, FamilyKernel, KernelType, validate_initial_params,
};
pub use self::model::UdmSnapshot;
pub use self::outcome::{StopReason, UdmOutcome};
pub use self::resolver::UdmResolver;
pub use self::setting::{ComponentSharing, UdmSetting};
