//! Lorentz drift parameters.
//!
//! Charge carriers drifting through the sensor in a magnetic field are
//! displaced sideways. The full shift accumulated across the sensor
//! thickness is what the estimator consumes.

use crate::config::CpeConfig;
use crate::geometry::DetectorRegion;
use serde::{Deserialize, Serialize};

/// Per-module Lorentz drift parameters in local-frame units (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorentzParams {
    /// Full drift shift along X.
    pub shift_x: f64,
    /// Full drift shift along Y.
    pub shift_y: f64,
    /// Fraction of the shift that widens the collected charge.
    pub width_fraction: f64,
}

impl Default for LorentzParams {
    fn default() -> Self {
        Self {
            shift_x: 0.0,
            shift_y: 0.0,
            width_fraction: 1.0,
        }
    }
}

impl LorentzParams {
    /// Creates Lorentz parameters.
    #[must_use]
    pub fn new(shift_x: f64, shift_y: f64, width_fraction: f64) -> Self {
        Self {
            shift_x,
            shift_y,
            width_fraction,
        }
    }
}

/// Calibration inputs for the Lorentz drift of one module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LorentzInputs {
    /// tan(Lorentz angle) per tesla.
    pub tan_lorentz_per_tesla: f64,
    /// tan(Lorentz angle) per tesla describing the charge width, from the database.
    pub width_tan_lorentz_per_tesla: Option<f64>,
    /// tan(Lorentz angle) per tesla measured by alignment.
    pub alignment_tan_lorentz_per_tesla: Option<f64>,
    /// Magnetic field in the module's local frame (tesla).
    pub local_field: [f64; 3],
}

/// Derives [`LorentzParams`] from module inputs and configuration overrides.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LorentzModel {
    offset_override: f64,
    width_override_barrel: f64,
    width_override_forward: f64,
    width_from_database: bool,
    alignment_offset: bool,
}

impl LorentzModel {
    /// Builds the model from the estimator configuration.
    #[must_use]
    pub fn from_config(config: &CpeConfig) -> Self {
        Self {
            offset_override: config.lorentz_offset_override,
            width_override_barrel: config.lorentz_width_override_barrel,
            width_override_forward: config.lorentz_width_override_forward,
            width_from_database: config.use_lorentz_width_from_database,
            alignment_offset: config.use_alignment_lorentz_offset,
        }
    }

    /// tan(Lorentz angle) per tesla after overrides.
    fn tan_lorentz(&self, inputs: &LorentzInputs) -> f64 {
        if self.offset_override > 0.0 {
            return self.offset_override;
        }
        match inputs.alignment_tan_lorentz_per_tesla {
            Some(aligned) if self.alignment_offset => aligned,
            _ => inputs.tan_lorentz_per_tesla,
        }
    }

    /// Ratio of the width angle to the offset angle.
    fn width_fraction(&self, inputs: &LorentzInputs, region: DetectorRegion, tan_lorentz: f64) -> f64 {
        if tan_lorentz == 0.0 {
            return 1.0;
        }
        let config_width = if region.is_barrel() {
            self.width_override_barrel
        } else {
            self.width_override_forward
        };
        if config_width > 0.0 {
            return config_width / tan_lorentz;
        }
        match inputs.width_tan_lorentz_per_tesla {
            Some(width) if self.width_from_database => width / tan_lorentz,
            _ => 1.0,
        }
    }

    /// Computes the drift parameters for a module.
    #[must_use]
    pub fn params(&self, inputs: &LorentzInputs, region: DetectorRegion, thickness: f64) -> LorentzParams {
        let tan_lorentz = self.tan_lorentz(inputs);
        let [bx, by, bz] = inputs.local_field;

        let dir_x = -(tan_lorentz * by);
        let dir_y = tan_lorentz * bx;
        let dir_z = -(1.0 + tan_lorentz * tan_lorentz * bz * bz);

        LorentzParams {
            shift_x: dir_x / dir_z * thickness,
            shift_y: dir_y / dir_z * thickness,
            width_fraction: self.width_fraction(inputs, region, tan_lorentz),
        }
    }
}
