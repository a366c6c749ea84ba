//! Estimator configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the generic cluster parameter estimator.
///
/// Lengths given in micrometres are converted to centimetres by the
/// estimator. Width-ratio cuts are in units of the pitch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpeConfig {
    /// Lower W_eff/pitch cut along X.
    pub eff_charge_cut_low_x: f64,
    /// Upper W_eff/pitch cut along X.
    pub eff_charge_cut_high_x: f64,
    /// Lower W_eff/pitch cut along Y.
    pub eff_charge_cut_low_y: f64,
    /// Upper W_eff/pitch cut along Y.
    pub eff_charge_cut_high_y: f64,
    /// Sizes along X at or above this use the edge-width fallback.
    pub size_cut_x: f64,
    /// Sizes along Y at or above this use the edge-width fallback.
    pub size_cut_y: f64,
    /// Error assigned to edge clusters along X (µm).
    pub edge_cluster_error_x: f64,
    /// Error assigned to edge clusters along Y (µm).
    pub edge_cluster_error_y: f64,
    /// Take position errors from calibration templates.
    pub use_calibrated_errors: bool,
    /// Cap pixel charges at the template truncation ceiling.
    pub truncate_charge: bool,
    /// Subtract the calibrated irradiation bias from the position.
    pub irradiation_bias_correction: bool,
    /// Replace tabulated errors with the uniform-width approximation.
    pub inflate_errors: bool,
    /// Inflate tabulated errors whenever no track direction is known.
    pub inflate_errors_ignoring_angle: bool,
    /// Use full templates instead of light templates.
    pub use_legacy_calibration: bool,
    /// Load templates from a database object instead of `calibration_path`.
    pub load_calibration_from_database: bool,
    /// Lorentz tan-angle per tesla overriding the calibrated one (0 = off).
    pub lorentz_offset_override: f64,
    /// Lorentz width tan-angle per tesla for barrel modules (0 = off).
    pub lorentz_width_override_barrel: f64,
    /// Lorentz width tan-angle per tesla for forward modules (0 = off).
    pub lorentz_width_override_forward: f64,
    /// Take the Lorentz width angle from the database.
    pub use_lorentz_width_from_database: bool,
    /// Take the Lorentz offset angle from alignment.
    pub use_alignment_lorentz_offset: bool,
    /// Use the error tables of the upgraded detector.
    pub upgrade_sensor_tables: bool,
    /// Use the small-pitch variant of the upgraded layer-1 tables.
    pub small_pitch_tables: bool,
    /// Reject non-positive errors instead of accepting them with a warning.
    pub strict_errors: bool,
    /// Template file read when templates are not taken from a database object.
    pub calibration_path: Option<PathBuf>,
}

impl Default for CpeConfig {
    fn default() -> Self {
        Self {
            eff_charge_cut_low_x: 0.0,
            eff_charge_cut_high_x: 1.0,
            eff_charge_cut_low_y: 0.0,
            eff_charge_cut_high_y: 1.0,
            size_cut_x: 3.0,
            size_cut_y: 3.0,
            edge_cluster_error_x: 50.0,
            edge_cluster_error_y: 85.0,
            use_calibrated_errors: true,
            truncate_charge: true,
            irradiation_bias_correction: false,
            inflate_errors: false,
            inflate_errors_ignoring_angle: false,
            use_legacy_calibration: true,
            load_calibration_from_database: false,
            lorentz_offset_override: 0.0,
            lorentz_width_override_barrel: 0.0,
            lorentz_width_override_forward: 0.0,
            use_lorentz_width_from_database: false,
            use_alignment_lorentz_offset: false,
            upgrade_sensor_tables: false,
            small_pitch_tables: false,
            strict_errors: cfg!(debug_assertions),
            calibration_path: None,
        }
    }
}

impl CpeConfig {
    /// Configuration using only tabulated errors, without templates.
    #[must_use]
    pub fn tabulated() -> Self {
        Self {
            use_calibrated_errors: false,
            truncate_charge: false,
            ..Self::default()
        }
    }

    /// Set the W_eff/pitch cuts along X.
    #[must_use]
    pub fn with_charge_cuts_x(mut self, low: f64, high: f64) -> Self {
        self.eff_charge_cut_low_x = low;
        self.eff_charge_cut_high_x = high;
        self
    }

    /// Set the W_eff/pitch cuts along Y.
    #[must_use]
    pub fn with_charge_cuts_y(mut self, low: f64, high: f64) -> Self {
        self.eff_charge_cut_low_y = low;
        self.eff_charge_cut_high_y = high;
        self
    }

    /// Set the size cuts.
    #[must_use]
    pub fn with_size_cuts(mut self, x: f64, y: f64) -> Self {
        self.size_cut_x = x;
        self.size_cut_y = y;
        self
    }

    /// Set the edge cluster errors (µm).
    #[must_use]
    pub fn with_edge_errors(mut self, x: f64, y: f64) -> Self {
        self.edge_cluster_error_x = x;
        self.edge_cluster_error_y = y;
        self
    }

    /// Set calibrated error usage.
    #[must_use]
    pub fn with_calibrated_errors(mut self, enabled: bool) -> Self {
        self.use_calibrated_errors = enabled;
        self
    }

    /// Set charge truncation.
    #[must_use]
    pub fn with_truncation(mut self, enabled: bool) -> Self {
        self.truncate_charge = enabled;
        self
    }

    /// Set the irradiation bias correction.
    #[must_use]
    pub fn with_bias_correction(mut self, enabled: bool) -> Self {
        self.irradiation_bias_correction = enabled;
        self
    }

    /// Set error inflation.
    #[must_use]
    pub fn with_inflated_errors(mut self, enabled: bool) -> Self {
        self.inflate_errors = enabled;
        self
    }

    /// Set strict handling of non-positive errors.
    #[must_use]
    pub fn with_strict_errors(mut self, strict: bool) -> Self {
        self.strict_errors = strict;
        self
    }

    /// Select full (legacy) or light templates.
    #[must_use]
    pub fn with_legacy_calibration(mut self, legacy: bool) -> Self {
        self.use_legacy_calibration = legacy;
        self
    }

    /// Applies forced settings and checks option combinations.
    ///
    /// The upgrade tables have no matching templates, so they force the
    /// tabulated error path.
    pub fn validated(mut self) -> Result<Self> {
        if self.upgrade_sensor_tables && self.use_calibrated_errors {
            log::warn!("upgrade sensor tables requested; calibrated errors disabled");
            self.use_calibrated_errors = false;
        }

        if !self.use_calibrated_errors {
            let dependent = [
                ("truncate_charge", self.truncate_charge),
                ("irradiation_bias_correction", self.irradiation_bias_correction),
                ("load_calibration_from_database", self.load_calibration_from_database),
            ];
            let enabled: Vec<&str> = dependent
                .iter()
                .filter(|(_, on)| *on)
                .map(|(name, _)| *name)
                .collect();
            if !enabled.is_empty() {
                return Err(Error::Config(format!(
                    "use_calibrated_errors is false; {} require calibrated errors",
                    enabled.join(", ")
                )));
            }
        }

        if self.small_pitch_tables && !self.upgrade_sensor_tables {
            return Err(Error::Config(
                "small_pitch_tables requires upgrade_sensor_tables".to_string(),
            ));
        }

        for (axis, low, high) in [
            ("x", self.eff_charge_cut_low_x, self.eff_charge_cut_high_x),
            ("y", self.eff_charge_cut_low_y, self.eff_charge_cut_high_y),
        ] {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(Error::Config(format!(
                    "invalid effective charge cuts along {axis}: [{low}, {high}]"
                )));
            }
        }

        if !(self.size_cut_x > 0.0 && self.size_cut_y > 0.0) {
            return Err(Error::Config(format!(
                "size cuts must be positive: ({}, {})",
                self.size_cut_x, self.size_cut_y
            )));
        }

        if !(self.edge_cluster_error_x > 0.0 && self.edge_cluster_error_y > 0.0) {
            return Err(Error::Config(format!(
                "edge cluster errors must be positive: ({}, {})",
                self.edge_cluster_error_x, self.edge_cluster_error_y
            )));
        }

        let lorentz = [
            self.lorentz_offset_override,
            self.lorentz_width_override_barrel,
            self.lorentz_width_override_forward,
        ];
        if lorentz.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::Config(
                "Lorentz overrides must be finite and non-negative".to_string(),
            ));
        }

        Ok(self)
    }
}
