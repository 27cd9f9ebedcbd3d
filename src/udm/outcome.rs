//! outcome — result of a multi-sample fit.
//!
//! Invariants
//! ----------
//! - `distribution_loss.len() == component_loss.len() == n_iterations`.
//! - The first `min(pretrain_epochs, n_iterations)` component-loss entries
//!   are exactly `0`.
//! - With `history_stride == 1`, `history.len() == n_iterations`.
//! - `component_matrix` is the mean over samples of `component_curves`.
use crate::{
    data::SizeClasses,
    udm::{kernel::KernelType, model::UdmSnapshot, setting::UdmSetting},
};
use ndarray::{Array2, Array3, Axis};
use std::time::Duration;

/// Why training stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// The epoch budget ran out.
    MaxEpochs,
    /// The early-stop criterion fired after `min_epochs`.
    Converged,
    /// A NaN loss ended training; the iteration was not recorded.
    NanLoss,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UdmOutcome {
    pub sample_names: Vec<String>,
    pub classes: SizeClasses,
    pub n_components: usize,
    pub kernel_name: String,
    /// `None` for custom kernels.
    pub kernel_type: Option<KernelType>,
    pub param_names: Vec<String>,
    /// Natural initial parameters, `K × P`, when given explicitly.
    pub initial_params: Option<Array2<f64>>,
    /// Mean component curves, `K × C`.
    pub component_matrix: Array2<f64>,
    /// Per-sample component curves, `S × K × C`.
    pub component_curves: Array3<f64>,
    /// `S × K`, rows on the simplex.
    pub proportions: Array2<f64>,
    /// Natural kernel parameters, `R × K × P` (`R = 1` when shared).
    pub final_params: Array3<f64>,
    pub distribution_loss: Vec<f64>,
    pub component_loss: Vec<f64>,
    pub n_iterations: usize,
    pub stop_reason: StopReason,
    pub time_spent: Duration,
    pub setting: UdmSetting,
    pub history: Vec<UdmSnapshot>,
}

impl UdmOutcome {
    pub fn n_samples(&self) -> usize {
        self.sample_names.len()
    }

    /// `C1, C2, …`
    pub fn component_names(&self) -> Vec<String> {
        (1..=self.n_components).map(|i| format!("C{i}")).collect()
    }

    /// Reconstructed distributions, `S × C`.
    pub fn reconstruction(&self) -> Array2<f64> {
        let (n_samples, _, n_classes) = self.component_curves.dim();
        let mut out = Array2::zeros((n_samples, n_classes));
        for (s, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
            row.assign(
                &self.proportions.row(s).dot(&self.component_curves.index_axis(Axis(0), s)),
            );
        }
        out
    }

    /// Last recorded distribution loss.
    pub fn final_distribution_loss(&self) -> Option<f64> {
        self.distribution_loss.last().copied()
    }
}
