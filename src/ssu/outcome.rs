//! outcome — result of a single-sample fit.
//!
//! Purpose
//! -------
//! Own everything a caller needs after a fit: the canonical parameter
//! vector, per-component summaries on the real class axis, the loss, and
//! the curves behind them.
//!
//! Invariants
//! ----------
//! - Components are ordered by ascending window-local mean, i.e. along
//!   increasing class index; `params` is the layout encoding of that order.
//! - `real_x`, `target`, `fitted` and every row of `component_curves` have
//!   the window's length.
//! - `loss` is the mean squared error between `target` and `fitted`.
use crate::{
    kernels::{density::ComponentDensity, family::DistributionType, layout::MixtureLayout},
    ssu::{
        errors::SsuResult,
        window::{ValidWindow, WindowMap},
    },
};

/// Local stage a trace point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitStage {
    /// Local-solver iteration inside the global stage.
    Local,
    /// Completed basin-hopping step.
    Hop,
    /// Local-solver iteration of the final polish.
    Polish,
}

/// One recorded cost value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TracePoint {
    pub stage: FitStage,
    /// Local-solver iteration, or hop index for [`FitStage::Hop`].
    pub iteration: u64,
    /// Current cost (best cost for hops).
    pub cost: f64,
}

/// Summary of one fitted component.
///
/// `shape` and `scale` are the family's two parameters in window-local
/// units (for Normal, `shape` holds the location). `mean`, `median` and
/// `mode` are mapped to the real class axis and are `NaN` when they fall
/// outside the window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentSummary {
    pub name: String,
    pub shape: f64,
    pub scale: f64,
    pub fraction: f64,
    /// 1-based index of the window start on the sample axis.
    pub x_offset: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Result of [`SsuResolver::try_fit`](crate::ssu::SsuResolver::try_fit).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SsuOutcome {
    pub name: String,
    pub distribution_type: DistributionType,
    pub n_components: usize,
    /// Fitted layout vector, canonical (mean-sorted) order.
    pub params: Vec<f64>,
    pub components: Vec<ComponentSummary>,
    /// Mean squared error of the reconstruction over the window.
    pub loss: f64,
    pub window: ValidWindow,
    /// Real class values inside the window.
    pub real_x: Vec<f64>,
    pub target: Vec<f64>,
    pub fitted: Vec<f64>,
    /// Weighted curve of every component, same order as `components`.
    pub component_curves: Vec<Vec<f64>>,
    /// Basin-hopping steps performed.
    pub hops: usize,
    /// Whether the final polish reported convergence.
    pub converged: bool,
    pub trace: Option<Vec<TracePoint>>,
}

/// Fit state handed over by the resolver.
pub(crate) struct FitRecord {
    pub params: Vec<f64>,
    pub hops: usize,
    pub converged: bool,
    pub trace: Option<Vec<TracePoint>>,
}

impl SsuOutcome {
    pub(crate) fn build(
        name: &str, layout: &MixtureLayout, window: ValidWindow, real_x: &[f64], y: &[f64],
        record: FitRecord,
    ) -> SsuResult<Self> {
        let family = layout.family();
        let decoded = layout.decode(&record.params)?;
        let params = layout.encode(&decoded)?;
        let local_x = window.local_x();
        let fitted = layout.evaluate(local_x.view(), &params)?;
        let map = WindowMap::new(real_x.to_vec());

        let mut components = Vec::with_capacity(decoded.len());
        let mut component_curves = Vec::with_capacity(decoded.len());
        for (i, comp) in decoded.iter().enumerate() {
            let density = ComponentDensity::new(family, &comp.params)?;
            let stats = density.statistics()?;
            component_curves.push(local_x.iter().map(|&x| comp.weight * density.pdf(x)).collect());
            components.push(ComponentSummary {
                name: format!("C{}", i + 1),
                shape: comp.params[0],
                scale: comp.params[1],
                fraction: comp.weight,
                x_offset: window.start + 1,
                mean: map.to_real(stats.mean),
                median: map.to_real(stats.median),
                mode: map.to_real(stats.mode),
                variance: stats.variance,
                standard_deviation: stats.standard_deviation,
                skewness: stats.skewness,
                kurtosis: stats.kurtosis,
            });
        }

        let n = y.len().max(1) as f64;
        let loss = y.iter().zip(fitted.iter()).map(|(y, f)| (f - y).powi(2)).sum::<f64>() / n;

        Ok(Self {
            name: name.to_string(),
            distribution_type: family,
            n_components: layout.n_components(),
            params,
            components,
            loss,
            window,
            real_x: real_x.to_vec(),
            target: y.to_vec(),
            fitted: fitted.to_vec(),
            component_curves,
            hops: record.hops,
            converged: record.converged,
            trace: record.trace,
        })
    }

    /// Component means on the real axis, in reported order.
    pub fn means(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.mean).collect()
    }
}
