//! kernel — component curves for the multi-sample resolver.
//!
//! Purpose
//! -------
//! Turn one row of trainable ("raw") kernel parameters into a component
//! curve over the class axis, together with the Jacobian of that curve
//! with respect to the raw parameters.
//!
//! Key behaviors
//! -------------
//! - [`ComponentKernel`] is the seam for custom kernels; [`FamilyKernel`]
//!   implements it for every [`KernelType`].
//! - Strictly positive family parameters are trained through
//!   `p = 1e−100 + softplus(raw)`; the others are trained directly.
//! - Normal and SkewNormal are evaluated on φ. Weibull and GeneralWeibull
//!   are evaluated on the shifted axis `φ − φ_min + interval`, which is
//!   strictly positive.
//! - Curves are densities times the class interval, so a component that
//!   lies inside the axis sums to about one.
//! - Parameters the family rejects (e.g. non-finite raw values) yield a NaN
//!   curve, which the resolver treats as a NaN loss.
use crate::{
    data::SizeClasses,
    kernels::{density::ComponentDensity, family::DistributionType},
    optimization::numerical_stability::transformations::{
        POSITIVE_FLOOR, safe_logistic, safe_softplus, safe_softplus_inv,
    },
    udm::errors::{UdmError, UdmResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use statrs::function::gamma::gamma;

/// Kernel families of the multi-sample resolver share the kernel library's
/// family names and parameter order.
pub type KernelType = DistributionType;

/// Class axis as seen by the kernels.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAxis {
    phi: Array1<f64>,
    shifted: Array1<f64>,
    interval: f64,
}

impl ClassAxis {
    pub fn new(classes: &SizeClasses) -> Self {
        let phi = classes.phi().clone();
        let interval = classes.interval();
        let min = phi.iter().copied().fold(f64::INFINITY, f64::min);
        let shifted = phi.mapv(|v| v - min + interval);
        Self { phi, shifted, interval }
    }

    pub fn phi(&self) -> &Array1<f64> {
        &self.phi
    }

    /// `φ − φ_min + interval`.
    pub fn shifted(&self) -> &Array1<f64> {
        &self.shifted
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.phi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phi.is_empty()
    }
}

/// A parametric component curve with trainable parameters.
///
/// Parameters exist in two spaces: natural (what the user reads and
/// passes as initial values) and raw (what Adam updates). Implementations
/// must keep [`to_raw`](Self::to_raw) and [`from_raw`](Self::from_raw)
/// mutually inverse on valid natural values.
pub trait ComponentKernel: Send + Sync {
    fn name(&self) -> String;

    /// Built-in family, if any.
    fn kernel_type(&self) -> Option<KernelType> {
        None
    }

    fn param_names(&self) -> Vec<String>;

    fn n_params(&self) -> usize {
        self.param_names().len()
    }

    /// Deterministic natural starting values, `n_components × n_params`.
    fn initial_params(&self, axis: &ClassAxis, n_components: usize) -> Array2<f64>;

    /// Natural → raw.
    ///
    /// # Errors
    /// - A `UdmError` for a wrong length or values outside the kernel's
    ///   domain.
    fn to_raw(&self, params: ArrayView1<f64>) -> UdmResult<Array1<f64>>;

    /// Raw → natural.
    fn from_raw(&self, raw: ArrayView1<f64>) -> Array1<f64>;

    /// Write the curve (length `axis.len()`) and its Jacobian with respect
    /// to `raw` (`axis.len() × n_params`).
    fn curve_with_grad(
        &self, raw: ArrayView1<f64>, axis: &ClassAxis, curve: ArrayViewMut1<f64>,
        jac: ArrayViewMut2<f64>,
    );
}

/// Kernel backed by one of the built-in families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyKernel {
    family: KernelType,
}

impl FamilyKernel {
    pub fn new(family: KernelType) -> Self {
        Self { family }
    }

    pub fn family(&self) -> KernelType {
        self.family
    }

    fn is_positive(&self, index: usize) -> bool {
        match self.family {
            DistributionType::Normal | DistributionType::SkewNormal => index == 1,
            DistributionType::Weibull => true,
            DistributionType::GeneralWeibull => index != 1,
        }
    }

    fn coordinates<'a>(&self, axis: &'a ClassAxis) -> &'a Array1<f64> {
        match self.family {
            DistributionType::Normal | DistributionType::SkewNormal => axis.phi(),
            DistributionType::Weibull | DistributionType::GeneralWeibull => axis.shifted(),
        }
    }
}

impl ComponentKernel for FamilyKernel {
    fn name(&self) -> String {
        self.family.name().to_string()
    }

    fn kernel_type(&self) -> Option<KernelType> {
        Some(self.family)
    }

    fn param_names(&self) -> Vec<String> {
        self.family.param_names().iter().map(|s| s.to_string()).collect()
    }

    fn initial_params(&self, axis: &ClassAxis, n_components: usize) -> Array2<f64> {
        let coords = self.coordinates(axis);
        let lo = coords.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = coords.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = hi - lo;
        let k = n_components as f64;
        // Means of shape-5 and shape-3 Weibulls in units of their scale.
        let (mean5, mean3) = (gamma(1.2), gamma(1.0 + 1.0 / 3.0));

        let mut out = Array2::zeros((n_components, self.family.n_params()));
        for (j, mut row) in out.rows_mut().into_iter().enumerate() {
            let q = lo + span * (j as f64 + 1.0) / (k + 1.0);
            let values: Vec<f64> = match self.family {
                DistributionType::Normal => vec![q, span / (4.0 * k)],
                DistributionType::SkewNormal => vec![q, span / (4.0 * k), 0.0],
                DistributionType::Weibull => vec![5.0, q / mean5],
                DistributionType::GeneralWeibull => {
                    let scale = span / (2.0 * k);
                    vec![3.0, q - scale * mean3, scale]
                }
            };
            row.assign(&Array1::from(values));
        }
        out
    }

    fn to_raw(&self, params: ArrayView1<f64>) -> UdmResult<Array1<f64>> {
        ComponentDensity::new(self.family, &params.to_vec())?;
        Ok(Array1::from_iter(params.iter().enumerate().map(|(i, &p)| {
            if self.is_positive(i) {
                safe_softplus_inv((p - POSITIVE_FLOOR).max(f64::MIN_POSITIVE))
            } else {
                p
            }
        })))
    }

    fn from_raw(&self, raw: ArrayView1<f64>) -> Array1<f64> {
        Array1::from_iter(raw.iter().enumerate().map(|(i, &r)| {
            if self.is_positive(i) { POSITIVE_FLOOR + safe_softplus(r) } else { r }
        }))
    }

    fn curve_with_grad(
        &self, raw: ArrayView1<f64>, axis: &ClassAxis, mut curve: ArrayViewMut1<f64>,
        mut jac: ArrayViewMut2<f64>,
    ) {
        jac.fill(0.0);
        let params = self.from_raw(raw);
        let Ok(density) = ComponentDensity::new(self.family, &params.to_vec()) else {
            curve.fill(f64::NAN);
            return;
        };
        let chain: Vec<f64> = raw
            .iter()
            .enumerate()
            .map(|(i, &r)| if self.is_positive(i) { safe_logistic(r) } else { 1.0 })
            .collect();
        let interval = axis.interval();
        let mut grad = vec![0.0; self.family.n_params()];
        for (c, &x) in self.coordinates(axis).iter().enumerate() {
            curve[c] = interval * density.pdf_with_grad(x, &mut grad);
            for (i, (g, d)) in grad.iter().zip(chain.iter()).enumerate() {
                jac[[c, i]] = interval * g * d;
            }
        }
    }
}

/// Check an explicit `n_components × n_params` matrix of natural initial
/// values and convert it to raw space.
///
/// # Errors
/// - `UdmError::InvalidArgument` for a wrong shape or invalid values.
pub fn validate_initial_params<K: ComponentKernel + ?Sized>(
    kernel: &K, params: &Array2<f64>, n_components: usize,
) -> UdmResult<Array2<f64>> {
    let expected = (n_components, kernel.n_params());
    if params.dim() != expected {
        return Err(UdmError::invalid(format!(
            "initial parameters must have shape {expected:?}, got {:?}",
            params.dim()
        )));
    }
    let mut raw = Array2::zeros(expected);
    for (j, row) in params.rows().into_iter().enumerate() {
        raw.row_mut(j).assign(&kernel.to_raw(row)?);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Axis construction and raw/natural round trips.
    // - Curve mass and the raw-space Jacobian against finite differences.
    // - Validation of explicit initial parameters.
    // -------------------------------------------------------------------------

    fn axis() -> ClassAxis {
        ClassAxis::new(&SizeClasses::linspace_phi(-2.0, 10.0, 121).expect("classes"))
    }

    #[test]
    // Purpose
    // -------
    // Initial curves of every family are valid and carry most of their mass
    // inside the axis.
    //
    // Given
    // -----
    // - 121 classes over φ ∈ [−2, 10] and 3 components.
    //
    // Expect
    // ------
    // - Shifted axis starts at the interval; every initial curve sums to
    //   within (0.8, 1.05); raw round trip is exact to 1e−10.
    fn initial_curves_are_proper() {
        let axis = axis();
        assert_relative_eq!(axis.shifted()[0], axis.interval(), epsilon = 1e-12);
        for family in KernelType::ALL {
            let kernel = FamilyKernel::new(family);
            let init = kernel.initial_params(&axis, 3);
            assert_eq!(init.dim(), (3, family.n_params()));
            for row in init.rows() {
                let raw = kernel.to_raw(row).expect("raw");
                let back = kernel.from_raw(raw.view());
                for (a, b) in back.iter().zip(row.iter()) {
                    assert_relative_eq!(*a, *b, max_relative = 1e-10, epsilon = 1e-12);
                }
                let mut curve = Array1::zeros(axis.len());
                let mut jac = Array2::zeros((axis.len(), kernel.n_params()));
                kernel.curve_with_grad(raw.view(), &axis, curve.view_mut(), jac.view_mut());
                let mass = curve.sum();
                assert!(mass > 0.8 && mass < 1.05, "{family}: mass {mass}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The raw-space Jacobian matches central differences of the curve.
    //
    // Given
    // -----
    // - One generic raw row per family. The GeneralWeibull location sits
    //   between classes, so no class lies on the support edge `x = loc`
    //   where the density has a kink.
    //
    // Expect
    // ------
    // - Every Jacobian entry within 1e−5 relative (1e−8 absolute).
    fn jacobian_matches_finite_differences() {
        let axis = axis();
        let rows = [
            (KernelType::Normal, array![3.0, 0.4]),
            (KernelType::SkewNormal, array![3.0, 0.6, 1.5]),
            (KernelType::Weibull, array![1.2, 1.8]),
            (KernelType::GeneralWeibull, array![1.1, 0.53, 1.6]),
        ];
        let n = axis.len();
        for (family, raw) in rows {
            let kernel = FamilyKernel::new(family);
            let p = kernel.n_params();
            let mut curve = Array1::zeros(n);
            let mut jac = Array2::zeros((n, p));
            kernel.curve_with_grad(raw.view(), &axis, curve.view_mut(), jac.view_mut());
            for i in 0..p {
                let h = 1e-6;
                let (mut up, mut down) = (raw.clone(), raw.clone());
                up[i] += h;
                down[i] -= h;
                let (mut cu, mut cd) = (Array1::zeros(n), Array1::zeros(n));
                let mut scratch = Array2::zeros((n, p));
                kernel.curve_with_grad(up.view(), &axis, cu.view_mut(), scratch.view_mut());
                kernel.curve_with_grad(down.view(), &axis, cd.view_mut(), scratch.view_mut());
                for c in 0..n {
                    let fd = (cu[c] - cd[c]) / (2.0 * h);
                    assert_relative_eq!(jac[[c, i]], fd, max_relative = 1e-5, epsilon = 1e-8);
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Explicit initial parameters are shape- and domain-checked.
    //
    // Given
    // -----
    // - A Weibull kernel, k = 2: a good matrix, a 3-column matrix, and a
    //   matrix with a negative scale.
    //
    // Expect
    // ------
    // - Ok, then `InvalidArgument`, then a kernel error.
    fn explicit_initial_params_are_validated() {
        let kernel = FamilyKernel::new(KernelType::Weibull);
        assert!(validate_initial_params(&kernel, &array![[2.0, 3.0], [4.0, 8.0]], 2).is_ok());
        assert!(matches!(
            validate_initial_params(&kernel, &array![[2.0, 3.0, 1.0], [4.0, 8.0, 1.0]], 2),
            Err(UdmError::InvalidArgument { .. })
        ));
        assert!(matches!(
            validate_initial_params(&kernel, &array![[2.0, -3.0], [4.0, 8.0]], 2),
            Err(UdmError::Kernel(_))
        ));
    }
}
