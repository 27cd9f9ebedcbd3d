//! layout — flat parameter layout of a k-component mixture.
//!
//! Purpose
//! -------
//! Describe, for a two-parameter family and a component count `k`, the flat
//! parameter vector the single-sample resolver optimizes, and evaluate the
//! mixture it encodes by folding over the layout.
//!
//! Key behaviors
//! -------------
//! - `k == 1`: the family's two parameters under their plain names, no
//!   fraction (the weight is implicitly 1).
//! - `k > 1`: `{p1}{i}`, `{p2}{i}` for `i` in `1..=k` (locations `2(i−1)` and
//!   `2(i−1)+1`), then fractions `f{i}` for `i` in `1..k` at `2k + i − 1`.
//!   The last component's weight is `1 − Σ f_i`.
//! - Defaults: family parameters 1, fractions `1/k`.
//! - Bounds: family parameters `(1e−100, +∞)`, fractions `[0, 1]`.
//! - Constraint: `1 − Σ f_i + 1e−100 ≥ 0`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The layout is a pure function of `(family, k)`; its length is
//!   `2k + max(k − 1, 0)`.
//! - [`MixtureLayout::decode`] sorts components by ascending family mean,
//!   and [`MixtureLayout::encode`] of the decoded components reproduces the
//!   same mixture curve.
use crate::kernels::{
    density::ComponentDensity,
    errors::{KernelError, KernelResult},
    family::DistributionType,
};
use ndarray::{Array1, Array2, ArrayView1};

/// Smallest admissible value of a positive family parameter, and the slack
/// of the fraction constraint.
pub const INFINITESIMAL: f64 = 1e-100;

/// What a layout entry controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamRole {
    Shape,
    Location,
    Scale,
    Fraction,
}

/// Closed/open interval of admissible values; `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn contains(&self, v: f64) -> bool {
        self.lower.is_none_or(|lo| v >= lo) && self.upper.is_none_or(|hi| v <= hi)
    }
}

/// One named scalar of the flat layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamSpec {
    pub name: String,
    pub role: ParamRole,
    /// 0-based component the entry belongs to.
    pub component: usize,
    /// Index in the flat vector.
    pub location: usize,
    pub default: f64,
    pub bounds: Bounds,
}

/// One decoded component: family parameters plus mixing weight.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixtureComponent {
    /// Family parameters in family order.
    pub params: [f64; 2],
    pub weight: f64,
}

/// Flat parameter layout of a `k`-component mixture of one family.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixtureLayout {
    family: DistributionType,
    n_components: usize,
    params: Vec<ParamSpec>,
}

impl MixtureLayout {
    /// Build the layout for `family` with `k` components.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` if `k == 0`.
    /// - `KernelError::NotImplemented` for families without a two-parameter
    ///   layout (SkewNormal, GeneralWeibull).
    pub fn new(family: DistributionType, k: usize) -> KernelResult<Self> {
        if k == 0 {
            return Err(KernelError::invalid("component count must be a positive integer"));
        }
        if !family.is_two_parameter() {
            return Err(KernelError::not_implemented(format!("mixture layout for {family}")));
        }
        let names = family.param_names();
        let roles = match family {
            DistributionType::Normal => [ParamRole::Location, ParamRole::Scale],
            _ => [ParamRole::Shape, ParamRole::Scale],
        };
        let positive = Bounds { lower: Some(INFINITESIMAL), upper: None };
        let mut params = Vec::with_capacity(3 * k - 1);
        for c in 0..k {
            for j in 0..2 {
                let name =
                    if k == 1 { names[j].to_string() } else { format!("{}{}", names[j], c + 1) };
                params.push(ParamSpec {
                    name,
                    role: roles[j],
                    component: c,
                    location: 2 * c + j,
                    default: 1.0,
                    bounds: positive,
                });
            }
        }
        for c in 0..k.saturating_sub(1) {
            params.push(ParamSpec {
                name: format!("f{}", c + 1),
                role: ParamRole::Fraction,
                component: c,
                location: 2 * k + c,
                default: 1.0 / k as f64,
                bounds: Bounds { lower: Some(0.0), upper: Some(1.0) },
            });
        }
        Ok(Self { family, n_components: k, params })
    }

    pub fn family(&self) -> DistributionType {
        self.family
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Number of flat parameters, `2k + max(k − 1, 0)`.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Layout entries ordered by location.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn defaults(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.default).collect()
    }

    pub fn bounds(&self) -> Vec<Bounds> {
        self.params.iter().map(|p| p.bounds).collect()
    }

    /// Index of the first fraction; equals [`len`](Self::len) when `k == 1`.
    pub fn fraction_offset(&self) -> usize {
        2 * self.n_components
    }

    /// Value of the inequality constraint `1 − Σ f_i + 1e−100`; feasible
    /// vectors give a non-negative value.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` on a length mismatch.
    pub fn constraint(&self, values: &[f64]) -> KernelResult<f64> {
        self.check_len(values)?;
        let total: f64 = values[self.fraction_offset()..].iter().sum();
        Ok(1.0 - total + INFINITESIMAL)
    }

    /// Mixing weights in layout order, the last one implied.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` on a length mismatch.
    pub fn weights(&self, values: &[f64]) -> KernelResult<Vec<f64>> {
        self.check_len(values)?;
        let fractions = &values[self.fraction_offset()..];
        let mut weights = fractions.to_vec();
        weights.push(1.0 - fractions.iter().sum::<f64>());
        Ok(weights)
    }

    /// Validated component densities with their weights, in layout order.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` on a length mismatch or invalid
    ///   family parameters.
    pub fn components(&self, values: &[f64]) -> KernelResult<Vec<(ComponentDensity, f64)>> {
        let weights = self.weights(values)?;
        weights
            .into_iter()
            .enumerate()
            .map(|(c, w)| {
                ComponentDensity::new(self.family, &values[2 * c..2 * c + 2]).map(|d| (d, w))
            })
            .collect()
    }

    /// Mixture density `Σ w_i f_i(x)` at every `x`.
    ///
    /// # Errors
    /// - See [`components`](Self::components).
    pub fn evaluate(&self, xs: ArrayView1<f64>, values: &[f64]) -> KernelResult<Array1<f64>> {
        let components = self.components(values)?;
        Ok(xs.mapv(|x| components.iter().fold(0.0, |acc, (d, w)| acc + w * d.pdf(x))))
    }

    /// Mixture density and its Jacobian (`xs.len() × len()`) with respect to
    /// the flat parameters.
    ///
    /// # Errors
    /// - See [`components`](Self::components).
    pub fn evaluate_with_grad(
        &self, xs: ArrayView1<f64>, values: &[f64],
    ) -> KernelResult<(Array1<f64>, Array2<f64>)> {
        let components = self.components(values)?;
        let k = self.n_components;
        let offset = self.fraction_offset();
        let mut out = Array1::zeros(xs.len());
        let mut jac = Array2::zeros((xs.len(), self.len()));
        let mut dens = vec![0.0; k];
        let mut grad = [0.0; 2];
        for (row, &x) in xs.iter().enumerate() {
            let mut total = 0.0;
            for (c, (density, w)) in components.iter().enumerate() {
                let f = density.pdf_with_grad(x, &mut grad);
                dens[c] = f;
                total += w * f;
                jac[[row, 2 * c]] = w * grad[0];
                jac[[row, 2 * c + 1]] = w * grad[1];
            }
            for c in 0..k - 1 {
                jac[[row, offset + c]] = dens[c] - dens[k - 1];
            }
            out[row] = total;
        }
        Ok((out, jac))
    }

    /// Decode a flat vector into components sorted by ascending mean.
    ///
    /// # Errors
    /// - See [`components`](Self::components).
    pub fn decode(&self, values: &[f64]) -> KernelResult<Vec<MixtureComponent>> {
        let mut keyed = self
            .components(values)?
            .into_iter()
            .map(|(d, weight)| {
                let p = d.params();
                Ok((d.mean()?, MixtureComponent { params: [p[0], p[1]], weight }))
            })
            .collect::<KernelResult<Vec<_>>>()?;
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, c)| c).collect())
    }

    /// Inverse of [`decode`](Self::decode): flat vector in layout order.
    ///
    /// # Errors
    /// - `KernelError::InvalidArgument` if the number of components differs
    ///   from the layout's.
    pub fn encode(&self, components: &[MixtureComponent]) -> KernelResult<Vec<f64>> {
        if components.len() != self.n_components {
            return Err(KernelError::invalid(format!(
                "expected {} components, got {}",
                self.n_components,
                components.len()
            )));
        }
        let mut values = vec![0.0; self.len()];
        for (c, comp) in components.iter().enumerate() {
            values[2 * c] = comp.params[0];
            values[2 * c + 1] = comp.params[1];
        }
        let offset = self.fraction_offset();
        for (c, comp) in components.iter().take(self.n_components - 1).enumerate() {
            values[offset + c] = comp.weight;
        }
        Ok(values)
    }

    fn check_len(&self, values: &[f64]) -> KernelResult<()> {
        if values.len() != self.len() {
            return Err(KernelError::invalid(format!(
                "parameter vector has {} entries, layout expects {}",
                values.len(),
                self.len()
            )));
        }
        Ok(())
    }
}
