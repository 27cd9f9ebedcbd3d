//! Parametric families supported by the kernel library.
use crate::kernels::errors::{KernelError, KernelResult};
use std::str::FromStr;

/// Parametric component family.
///
/// Parameter order per family (the order used by every slice-based API in
/// this crate):
/// - `Normal`: `[loc, scale]`
/// - `SkewNormal`: `[loc, scale, shape]`
/// - `Weibull`: `[shape, scale]`
/// - `GeneralWeibull`: `[shape, loc, scale]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistributionType {
    Normal,
    SkewNormal,
    Weibull,
    GeneralWeibull,
}

impl DistributionType {
    pub const ALL: [DistributionType; 4] = [
        DistributionType::Normal,
        DistributionType::SkewNormal,
        DistributionType::Weibull,
        DistributionType::GeneralWeibull,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DistributionType::Normal => "Normal",
            DistributionType::SkewNormal => "SkewNormal",
            DistributionType::Weibull => "Weibull",
            DistributionType::GeneralWeibull => "GeneralWeibull",
        }
    }

    /// Parameter names in slice order.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            DistributionType::Normal => &["loc", "scale"],
            DistributionType::SkewNormal => &["loc", "scale", "shape"],
            DistributionType::Weibull => &["shape", "scale"],
            DistributionType::GeneralWeibull => &["shape", "loc", "scale"],
        }
    }

    pub fn n_params(&self) -> usize {
        self.param_names().len()
    }

    /// `true` for the two-parameter families usable in a [`MixtureLayout`].
    ///
    /// [`MixtureLayout`]: crate::kernels::layout::MixtureLayout
    pub fn is_two_parameter(&self) -> bool {
        self.n_params() == 2
    }
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistributionType {
    type Err = KernelError;

    /// Case-insensitive; `-`, `_` and spaces are ignored
    /// (`"general_weibull"`, `"Skew-Normal"`).
    fn from_str(s: &str) -> KernelResult<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "normal" => Ok(DistributionType::Normal),
            "skewnormal" => Ok(DistributionType::SkewNormal),
            "weibull" => Ok(DistributionType::Weibull),
            "generalweibull" => Ok(DistributionType::GeneralWeibull),
            _ => Err(KernelError::not_implemented(format!("distribution family '{s}'"))),
        }
    }
}
