//! Closed-form moment statistics of single components.
//!
//! Weibull formulas use `Γ` from `statrs`; GeneralWeibull is a Weibull
//! shifted by `loc`, so only location statistics move. Kurtosis is the plain
//! (non-excess) fourth standardized moment. SkewNormal statistics are not
//! provided.
use crate::kernels::{
    density::ComponentDensity,
    errors::{KernelError, KernelResult},
    family::DistributionType,
};
use statrs::function::gamma::gamma;
use std::f64::consts::LN_2;

/// Moment statistics of one component, in the component's own coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentStatistics {
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl ComponentDensity {
    /// Mean of the component.
    ///
    /// # Errors
    /// - `KernelError::NotImplemented` for SkewNormal.
    pub fn mean(&self) -> KernelResult<f64> {
        let p = self.params();
        match self.family() {
            DistributionType::Normal => Ok(p[0]),
            DistributionType::Weibull => Ok(p[1] * gamma(1.0 + 1.0 / p[0])),
            DistributionType::GeneralWeibull => Ok(p[1] + p[2] * gamma(1.0 + 1.0 / p[0])),
            DistributionType::SkewNormal => {
                Err(KernelError::not_implemented("SkewNormal statistics"))
            }
        }
    }

    /// All closed-form statistics of the component.
    ///
    /// # Errors
    /// - `KernelError::NotImplemented` for SkewNormal.
    pub fn statistics(&self) -> KernelResult<ComponentStatistics> {
        let p = self.params();
        match self.family() {
            DistributionType::Normal => Ok(ComponentStatistics {
                mean: p[0],
                median: p[0],
                mode: p[0],
                variance: p[1] * p[1],
                standard_deviation: p[1],
                skewness: 0.0,
                kurtosis: 3.0,
            }),
            DistributionType::Weibull => Ok(weibull_statistics(p[0], p[1], 0.0)),
            DistributionType::GeneralWeibull => Ok(weibull_statistics(p[0], p[2], p[1])),
            DistributionType::SkewNormal => {
                Err(KernelError::not_implemented("SkewNormal statistics"))
            }
        }
    }
}

fn weibull_statistics(k: f64, lambda: f64, loc: f64) -> ComponentStatistics {
    let g1 = gamma(1.0 + 1.0 / k);
    let g2 = gamma(1.0 + 2.0 / k);
    let g3 = gamma(1.0 + 3.0 / k);
    let g4 = gamma(1.0 + 4.0 / k);
    let spread = g2 - g1 * g1;
    let mode = if k > 1.0 { lambda * ((k - 1.0) / k).powf(1.0 / k) } else { 0.0 };
    ComponentStatistics {
        mean: loc + lambda * g1,
        median: loc + lambda * LN_2.powf(1.0 / k),
        mode: loc + mode,
        variance: lambda * lambda * spread,
        standard_deviation: lambda * spread.sqrt(),
        skewness: (2.0 * g1.powi(3) - 3.0 * g1 * g2 + g3) / spread.powf(1.5),
        kurtosis: (-3.0 * g1.powi(4) + 6.0 * g2 * g1 * g1 - 4.0 * g1 * g3 + g4) / (spread * spread),
    }
}
