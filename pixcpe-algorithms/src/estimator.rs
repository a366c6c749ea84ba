//! Generic cluster parameter estimator.
//!
//! 1. Calibration: look up templates when calibrated errors are in use
//! 2. Edge charges: first/last row and column charges, optionally truncated
//! 3. Position: charge-sharing formula per axis plus half the Lorentz shift
//! 4. Bias: optional irradiation bias correction
//! 5. Errors: calibrated, tabulated, edge or inflated per axis

use crate::bias::bias_correction;
use crate::edge_charges::collect_edge_charges;
use crate::error_model::ErrorModel;
use crate::lorentz::AxisLorentz;
use crate::position::{generic_position, AxisProjection, ChargeWidthCuts};
use pixcpe_core::calibration::{
    CalibrationProvider, CalibrationQuery, CalibrationResult, TemplateDbObject, TemplateStore,
    TemplateStrategy,
};
use pixcpe_core::cluster::Cluster;
use pixcpe_core::config::CpeConfig;
use pixcpe_core::error::{Error, Result};
use pixcpe_core::geometry::{
    DetectorUnit, LocalError, LocalPoint, MeasurementPoint, PixelTopology, TrackDirection,
};
use pixcpe_core::lorentz::{LorentzInputs, LorentzModel, LorentzParams};
use pixcpe_core::statistics::CpeStatistics;

/// Estimated hit: local position and error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEstimate {
    /// Local position (cm).
    pub position: LocalPoint,
    /// Local error (cm²).
    pub error: LocalError,
    /// Charge bin of the calibration used, if any.
    pub qbin: Option<u8>,
    /// Whether each axis fell back to the average edge width.
    pub used_edge: (bool, bool),
}

/// Trait for cluster parameter estimators.
pub trait ClusterParameterEstimator: Send + Sync {
    /// Estimator name.
    fn name(&self) -> &'static str;

    /// Current configuration.
    fn config(&self) -> &CpeConfig;

    /// Estimates position and error of one cluster.
    ///
    /// # Arguments
    /// * `cluster` - Cluster to estimate
    /// * `unit` - Module the cluster was found on
    /// * `track` - Measured local track direction, if known
    /// * `lorentz` - Lorentz drift of the module
    /// * `stats` - Counters updated by this call
    fn estimate(
        &self,
        cluster: &Cluster,
        unit: &DetectorUnit<'_>,
        track: Option<&TrackDirection>,
        lorentz: &LorentzParams,
        stats: &mut CpeStatistics,
    ) -> Result<HitEstimate>;
}

/// Charge-sharing estimator with template or tabulated errors.
#[derive(Debug, Clone)]
pub struct GenericCpe {
    config: CpeConfig,
    cuts_x: ChargeWidthCuts,
    cuts_y: ChargeWidthCuts,
    errors: ErrorModel,
    lorentz: LorentzModel,
    calibration: Option<TemplateStore>,
}

impl GenericCpe {
    /// Creates the estimator.
    ///
    /// A template store is required exactly when calibrated errors are used.
    pub fn new(config: CpeConfig, calibration: Option<TemplateStore>) -> Result<Self> {
        let config = config.validated()?;

        let calibration = match (config.use_calibrated_errors, calibration) {
            (true, Some(store)) => Some(store),
            (true, None) => {
                return Err(Error::Config(
                    "calibrated errors require a template store".to_string(),
                ))
            }
            (false, Some(_)) => {
                log::debug!("calibrated errors disabled; ignoring template store");
                None
            }
            (false, None) => None,
        };

        log::debug!(
            "generic CPE: errors from {}, truncation={}, bias correction={}",
            calibration.as_ref().map_or("tables", |store| store.name()),
            config.truncate_charge,
            config.irradiation_bias_correction
        );

        Ok(Self {
            cuts_x: ChargeWidthCuts {
                low: config.eff_charge_cut_low_x,
                high: config.eff_charge_cut_high_x,
                size_cut: config.size_cut_x,
            },
            cuts_y: ChargeWidthCuts {
                low: config.eff_charge_cut_low_y,
                high: config.eff_charge_cut_high_y,
                size_cut: config.size_cut_y,
            },
            errors: ErrorModel::from_config(&config),
            lorentz: LorentzModel::from_config(&config),
            calibration,
            config,
        })
    }

    /// Creates the estimator, reading templates from `calibration_path`.
    pub fn from_config(config: CpeConfig) -> Result<Self> {
        let config = config.validated()?;
        if !config.use_calibrated_errors {
            return Self::new(config, None);
        }
        if config.load_calibration_from_database {
            return Err(Error::Config(
                "templates from a database object must be passed to from_db_object".to_string(),
            ));
        }
        let path = config
            .calibration_path
            .clone()
            .ok_or_else(|| Error::Config("calibration_path is not set".to_string()))?;
        let store = TemplateStore::from_file(&path, TemplateStrategy::from_config(&config))?;
        Self::new(config, Some(store))
    }

    /// Creates the estimator from a database template payload.
    pub fn from_db_object(config: CpeConfig, object: &TemplateDbObject) -> Result<Self> {
        let config = config.validated()?;
        let store = TemplateStore::from_db_object(object, TemplateStrategy::from_config(&config))?;
        Self::new(config, Some(store))
    }

    /// Template store in use, if any.
    #[must_use]
    pub fn calibration(&self) -> Option<&TemplateStore> {
        self.calibration.as_ref()
    }

    /// Lorentz drift of a module under this configuration.
    #[must_use]
    pub fn lorentz_params(&self, inputs: &LorentzInputs, unit: &DetectorUnit<'_>) -> LorentzParams {
        self.lorentz
            .params(inputs, unit.region, unit.topology.thickness())
    }

    fn lookup_calibration(
        &self,
        cluster: &Cluster,
        unit: &DetectorUnit<'_>,
        track: Option<&TrackDirection>,
    ) -> Result<Option<CalibrationResult>> {
        let (Some(store), Some(track)) = (&self.calibration, track) else {
            return Ok(None);
        };
        let query = CalibrationQuery {
            module_id: unit.id,
            track: *track,
            local_bz: unit.local_bz,
            cluster_charge: cluster.charge(),
        };
        Ok(Some(store.calibrate(&query)?.to_local_units()))
    }
}

impl ClusterParameterEstimator for GenericCpe {
    fn name(&self) -> &'static str {
        "Generic"
    }

    fn config(&self) -> &CpeConfig {
        &self.config
    }

    fn estimate(
        &self,
        cluster: &Cluster,
        unit: &DetectorUnit<'_>,
        track: Option<&TrackDirection>,
        lorentz: &LorentzParams,
        stats: &mut CpeStatistics,
    ) -> Result<HitEstimate> {
        cluster.check_reported_size();

        let calibration = self.lookup_calibration(cluster, unit, track)?;
        let topology = unit.topology;
        let bounds = cluster.bounds();
        let direction = track.copied().unwrap_or(unit.nominal_direction);

        let mut lorentz_x = AxisLorentz::new(lorentz.shift_x, lorentz.width_fraction);
        let mut lorentz_y = AxisLorentz::new(lorentz.shift_y, lorentz.width_fraction);
        if let Some(cal) = &calibration {
            if let Some(width) = cal.x.charge_width {
                lorentz_x = lorentz_x.with_calibrated_width(width);
            }
            if let Some(width) = cal.y.charge_width {
                lorentz_y = lorentz_y.with_calibrated_width(width);
            }
        }

        let ceiling = calibration
            .as_ref()
            .filter(|_| self.config.truncate_charge)
            .map(|cal| cal.truncation_ceiling);
        let charges = collect_edge_charges(cluster, ceiling);

        // Upper corner of the first cell and lower corner of the last cell.
        let inner_low = MeasurementPoint::new(f64::from(bounds.min_row) + 1.0, f64::from(bounds.min_col) + 1.0);
        let inner_high = MeasurementPoint::new(f64::from(bounds.max_row), f64::from(bounds.max_col));
        let (low, high) = match track {
            Some(track) => (
                topology.local_position_along(inner_low, track),
                topology.local_position_along(inner_high, track),
            ),
            None => (topology.local_position(inner_low), topology.local_position(inner_high)),
        };

        let x = generic_position(
            &AxisProjection {
                size: cluster.size_x(),
                q_first: charges.first_x,
                q_last: charges.last_x,
                upper_edge_first: low.x,
                lower_edge_last: high.x,
                lorentz_width: lorentz_x.charge_width,
                cot_angle: direction.cot_alpha,
                pitch: topology.pitch_x(),
                thickness: topology.thickness(),
                first_is_big: topology.is_big_x(bounds.min_row),
                last_is_big: topology.is_big_x(bounds.max_row),
            },
            &self.cuts_x,
        );
        let y = generic_position(
            &AxisProjection {
                size: cluster.size_y(),
                q_first: charges.first_y,
                q_last: charges.last_y,
                upper_edge_first: low.y,
                lower_edge_last: high.y,
                lorentz_width: lorentz_y.charge_width,
                cot_angle: direction.cot_beta,
                pitch: topology.pitch_y(),
                thickness: topology.thickness(),
                first_is_big: topology.is_big_y(bounds.min_col),
                last_is_big: topology.is_big_y(bounds.max_col),
            },
            &self.cuts_y,
        );

        let mut x_pos = x.position + lorentz_x.offset;
        let mut y_pos = y.position + lorentz_y.offset;

        if self.config.irradiation_bias_correction {
            if let Some(cal) = &calibration {
                x_pos -= bias_correction(
                    cluster.size_x(),
                    lorentz_x.shift,
                    topology.is_big_x(bounds.max_row),
                    &cal.x,
                );
                y_pos -= bias_correction(
                    cluster.size_y(),
                    lorentz_y.shift,
                    topology.is_big_y(bounds.max_col),
                    &cal.y,
                );
            }
        }

        let error = self
            .errors
            .local_error(cluster, unit, calibration.as_ref(), track.is_some())?;

        stats.record_hit();
        if x.used_edge {
            stats.record_edge_fallback();
        }
        if y.used_edge {
            stats.record_edge_fallback();
        }

        Ok(HitEstimate {
            position: LocalPoint::new(x_pos, y_pos),
            error,
            qbin: calibration.map(|cal| cal.qbin),
            used_edge: (x.used_edge, y.used_edge),
        })
    }
}
