use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_FOM_THRESHOLD, DEFAULT_MAX_ROUNDS};
use crate::ctf::{CtfParams, Microscope};
use crate::error::{CtfError, Result};
use crate::estimate::astigmatism::AstigmatismSettings;
use crate::estimate::baseline::BaselineSettings;
use crate::estimate::defocus::DefocusSearch;
use crate::estimate::envelope::EnvelopeSettings;
use crate::estimate::water_ring::WaterRingBands;
use crate::fit::SimplexSettings;

/// Everything a CTF fit needs besides the spectrum itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub microscope: Microscope,
    pub resolution: ResolutionConfig,
    pub defocus: DefocusSearch,
    pub astigmatism: AstigmatismSettings,
    pub baseline: BaselineSettings,
    pub envelope: EnvelopeSettings,
    pub simplex: SimplexSettings,
    pub water_ring: WaterRingBands,
    pub iteration: IterationConfig,
}

impl FitConfig {
    /// Starting parameters at `defocus` for this config's microscope.
    pub fn seed(&self, defocus: f64) -> CtfParams {
        CtfParams::new(self.microscope, defocus)
    }

    /// Check the settings that would make a fit meaningless.
    pub fn validate(&self) -> Result<()> {
        let r = &self.resolution;
        if !(r.hires > 0.0 && r.lores > r.hires) {
            return Err(CtfError::InvalidRange(format!(
                "resolution {} .. {} A",
                r.lores, r.hires
            )));
        }
        self.defocus.clamped()?;
        Ok(())
    }
}

/// Resolution range (A) of the spectrum that takes part in fitting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Low resolution limit (A).
    pub lores: f64,
    /// High resolution limit (A).
    pub hires: f64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            lores: 20.0,
            hires: 5.0,
        }
    }
}

/// Outer loop control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    pub max_rounds: usize,
    /// Stop once the figure of merit changes by less than this between rounds.
    pub fom_threshold: f64,
    /// Return the profile and model curves with the result.
    pub keep_curves: bool,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            fom_threshold: DEFAULT_FOM_THRESHOLD,
            keep_curves: false,
        }
    }
}
