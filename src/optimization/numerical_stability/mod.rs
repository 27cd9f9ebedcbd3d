//! numerical_stability — numerically robust parameter transforms.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar and vector transforms used to map
//! unconstrained optimizer coordinates into the constrained domains of the
//! mixture models: strictly positive kernel parameters and probability
//! simplices of mixing fractions/proportions.
//!
//! Key behaviors
//! -------------
//! - Provide stable scalar transforms (`safe_softplus`, its inverse, and
//!   `safe_logistic`) for mapping unconstrained reals into strictly positive
//!   parameters without overflow/underflow.
//! - Implement a max-shifted softmax with an implicit reference logit
//!   (`safe_softmax`) and its vector–Jacobian product (`safe_softmax_deriv`)
//!   so `k − 1` free logits span all `k` mixing fractions.
//! - Centralize small numeric constants (`POSITIVE_FLOOR`, `LOGIT_CLAMP`).
//!
//! Invariants & assumptions
//! ------------------------
//! - All public transforms assume finite `f64` inputs; shape validation is
//!   enforced in the resolver layers, not here.
//! - Softmax outputs are strictly positive and sum to one up to rounding.
//!
//! Conventions
//! -----------
//! - Routines operate on `ndarray` views and favor in-place updates.
//! - This module never logs or touches global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare the guarded transforms with
//!   naïve formulas and check the softmax VJP by finite differences.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    LOGIT_CLAMP, POSITIVE_FLOOR, safe_logistic, safe_softmax, safe_softmax_deriv, safe_softplus,
    safe_softplus_inv, softmax_row,
};

pub mod prelude {
    pub use super::transformations::{
        LOGIT_CLAMP, POSITIVE_FLOOR, safe_logistic, safe_softmax, safe_softplus,
        safe_softplus_inv, softmax_row,
    };
}
