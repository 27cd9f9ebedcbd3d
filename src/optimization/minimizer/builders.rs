//! minimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Hide Argmin's generic wiring behind two builders, one per supported line
//! search, and apply the tolerances carried by [`MinimizerOptions`].
//!
//! Conventions
//! -----------
//! - Builders do **not** set the initial parameter vector or `max_iters`;
//!   both are runtime concerns applied by [`run_lbfgs`](super::run::run_lbfgs).
//! - The L-BFGS memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    minimizer::{
        traits::MinimizerOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search and the tolerances from `opts`.
///
/// # Errors
/// - `OptError` if Argmin rejects a tolerance.
pub fn build_optimizer_hager_zhang(opts: &MinimizerOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search and the tolerances from `opts`.
///
/// # Errors
/// - `OptError` if Argmin rejects a tolerance.
pub fn build_optimizer_more_thuente(opts: &MinimizerOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the optional gradient and cost-change tolerances to any L-BFGS
/// variant. `None` leaves Argmin's default in place.
///
/// # Errors
/// - `OptError` (via `From<argmin::core::Error>`) for rejected tolerances.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MinimizerOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::minimizer::traits::{LineSearcher, Tolerances};

    #[test]
    // Purpose
    // -------
    // Both builders accept the tight tolerances used by the polish stage.
    //
    // Given
    // -----
    // - `tol_grad = tol_cost = 1e-100`, default and explicit memory.
    //
    // Expect
    // ------
    // - Both builders return `Ok(_)`.
    fn builders_accept_tight_tolerances() {
        let tols = Tolerances::uniform(1e-100, 1000).expect("valid tolerances");
        let opts = MinimizerOptions::new(tols, LineSearcher::MoreThuente, false, None)
            .expect("valid options");
        assert!(build_optimizer_more_thuente(&opts).is_ok());
        let opts = MinimizerOptions::new(tols, LineSearcher::HagerZhang, false, Some(11))
            .expect("valid options");
        assert!(build_optimizer_hager_zhang(&opts).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Absent tolerances leave the solver constructible.
    //
    // Given
    // -----
    // - Only an iteration cap.
    //
    // Expect
    // ------
    // - `configure_lbfgs` returns `Ok(_)`.
    fn configure_lbfgs_respects_absent_tolerances() {
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("valid tolerances");
        let opts = MinimizerOptions::new(tols, LineSearcher::MoreThuente, false, None)
            .expect("valid options");
        assert!(configure_lbfgs(raw, &opts).is_ok());
    }
}
