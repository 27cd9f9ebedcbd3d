//! Configuration of the multi-sample resolver.
use crate::{
    optimization::adam::AdamOptions,
    udm::errors::{UdmError, UdmResult},
};
use std::str::FromStr;

/// How kernel parameters are laid out across samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentSharing {
    /// Every sample row owns its kernel parameters; rows are tied together
    /// only through the divergence penalty.
    #[default]
    PerSample,
    /// One parameter set per component, broadcast to every sample. The
    /// divergence penalty is identically zero.
    Shared,
}

impl FromStr for ComponentSharing {
    type Err = UdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect();
        match key.to_ascii_lowercase().as_str() {
            "persample" => Ok(Self::PerSample),
            "shared" => Ok(Self::Shared),
            _ => Err(UdmError::invalid(format!("unknown component sharing '{s}'"))),
        }
    }
}

/// Tunable knobs of [`UdmResolver`](crate::udm::UdmResolver).
///
/// Defaults
/// --------
/// - 50 pretrain epochs, 200 minimum and 2000 maximum main epochs;
/// - early-stop precision 6 (threshold `1e−6`);
/// - Adam with learning rate `5e−2` and betas `(0.8, 0.5)`;
/// - constraint level 2 (penalty weight `10²`);
/// - per-sample kernel parameters, full history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UdmSetting {
    pub pretrain_epochs: usize,
    pub min_epochs: usize,
    pub max_epochs: usize,
    pub precision: f64,
    pub learning_rate: f64,
    pub betas: (f64, f64),
    pub constraint_level: f64,
    pub sharing: ComponentSharing,
    /// Keep one history snapshot every `history_stride` iterations.
    pub history_stride: usize,
}

impl Default for UdmSetting {
    fn default() -> Self {
        Self {
            pretrain_epochs: 50,
            min_epochs: 200,
            max_epochs: 2000,
            precision: 6.0,
            learning_rate: 5e-2,
            betas: (0.8, 0.5),
            constraint_level: 2.0,
            sharing: ComponentSharing::PerSample,
            history_stride: 1,
        }
    }
}

impl UdmSetting {
    /// # Errors
    /// - `UdmError::InvalidArgument` for `min_epochs > max_epochs`, a zero
    ///   stride, or non-finite precision / constraint level.
    /// - `UdmError::Optimization` for invalid Adam hyper-parameters.
    pub fn validate(&self) -> UdmResult<()> {
        self.adam_options()?;
        if self.min_epochs > self.max_epochs {
            return Err(UdmError::invalid(format!(
                "min_epochs ({}) exceeds max_epochs ({})",
                self.min_epochs, self.max_epochs
            )));
        }
        if self.history_stride == 0 {
            return Err(UdmError::invalid("history_stride must be at least 1"));
        }
        if !self.precision.is_finite() || !self.constraint_level.is_finite() {
            return Err(UdmError::invalid("precision and constraint_level must be finite"));
        }
        Ok(())
    }

    pub fn adam_options(&self) -> UdmResult<AdamOptions> {
        Ok(AdamOptions::new(self.learning_rate, self.betas.0, self.betas.1)?)
    }

    /// Weight of the divergence term, `10^constraint_level`.
    pub fn penalty_weight(&self) -> f64 {
        10f64.powf(self.constraint_level)
    }

    /// Early-stop threshold, `10^(−precision)`.
    pub fn stop_threshold(&self) -> f64 {
        10f64.powf(-self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults validate and each bad knob is rejected.
    //
    // Given
    // -----
    // - The default setting and four single-field corruptions.
    //
    // Expect
    // ------
    // - Defaults pass with weight 100 and threshold 1e−6; corruptions fail.
    fn defaults_validate_and_bad_knobs_fail() {
        let s = UdmSetting::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.penalty_weight(), 100.0);
        assert!((s.stop_threshold() - 1e-6).abs() < 1e-18);

        let bad = [
            UdmSetting { learning_rate: 0.0, ..UdmSetting::default() },
            UdmSetting { betas: (1.0, 0.5), ..UdmSetting::default() },
            UdmSetting { min_epochs: 10, max_epochs: 5, ..UdmSetting::default() },
            UdmSetting { history_stride: 0, ..UdmSetting::default() },
        ];
        for s in bad {
            assert!(s.validate().is_err(), "{s:?}");
        }
        assert_eq!("per-sample".parse::<ComponentSharing>(), Ok(ComponentSharing::PerSample));
        assert_eq!("SHARED".parse::<ComponentSharing>(), Ok(ComponentSharing::Shared));
    }
}
