//! Per-epoch hooks for multi-sample training.
use std::ops::ControlFlow;

/// Training phase of a recorded iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrainingPhase {
    /// Kernel parameters frozen, proportions trained.
    Pretrain,
    /// Both groups trained under the divergence penalty.
    Main,
}

/// What a hook sees after each recorded iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub phase: TrainingPhase,
    /// Epoch index within the phase.
    pub epoch: usize,
    /// Iteration index over the whole run.
    pub iteration: usize,
    pub distribution_loss: f64,
    /// Weighted divergence term; `0` while pretraining.
    pub component_loss: f64,
}

pub trait UdmHooks: Send + Sync {
    /// Called after each recorded iteration; `Break` cancels training.
    fn on_epoch(&self, _report: &EpochReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl UdmHooks for NoHooks {}
