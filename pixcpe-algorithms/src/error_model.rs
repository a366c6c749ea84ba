//! Hit position errors.
//!
//! Errors come from calibration templates when available, otherwise from
//! the region/size tables. Clusters touching the sensor edge always get the
//! configured edge error on that axis.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use pixcpe_core::calibration::{CalibrationResult, MICRONS_TO_CM};
use pixcpe_core::cluster::Cluster;
use pixcpe_core::config::CpeConfig;
use pixcpe_core::error::{Error, Result};
use pixcpe_core::error_tables::{ErrorTableVariant, ErrorTables};
use pixcpe_core::geometry::{Axis, DetectorUnit, LocalError, PixelTopology};

/// Rows scanned for oversized cells when inflating X errors.
pub const INFLATION_SCAN_ROWS: u16 = 7;
/// Columns scanned for oversized cells when inflating Y errors.
pub const INFLATION_SCAN_COLS: u16 = 21;

/// Shape of a cluster along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisShape {
    axis: Axis,
    size: u16,
    start: u16,
    edge: bool,
    contains_big: bool,
}

impl AxisShape {
    fn of(cluster: &Cluster, topology: &dyn PixelTopology, axis: Axis) -> Self {
        let bounds = cluster.bounds();
        match axis {
            Axis::X => Self {
                axis,
                size: cluster.size_x(),
                start: bounds.min_row,
                edge: topology.is_edge_x(bounds.min_row) || topology.is_edge_x(bounds.max_row),
                contains_big: topology.contains_big_x(bounds.min_row, bounds.max_row),
            },
            Axis::Y => Self {
                axis,
                size: cluster.size_y(),
                start: bounds.min_col,
                edge: topology.is_edge_y(bounds.min_col) || topology.is_edge_y(bounds.max_col),
                contains_big: topology.contains_big_y(bounds.min_col, bounds.max_col),
            },
        }
    }

    /// Oversized cells in the fixed window starting at the first cell.
    fn big_cells_in_window(&self, topology: &dyn PixelTopology) -> usize {
        let window = match self.axis {
            Axis::X => INFLATION_SCAN_ROWS,
            Axis::Y => INFLATION_SCAN_COLS,
        };
        (0..window)
            .filter_map(|offset| self.start.checked_add(offset))
            .filter(|&index| match self.axis {
                Axis::X => topology.is_big_x(index),
                Axis::Y => topology.is_big_y(index),
            })
            .count()
    }
}

/// Selects and validates per-axis position errors.
#[derive(Debug, Clone)]
pub struct ErrorModel {
    edge_error_x: f64,
    edge_error_y: f64,
    tables: ErrorTables,
    inflate: bool,
    inflate_without_angle: bool,
    strict: bool,
}

impl ErrorModel {
    /// Builds the model from a validated configuration.
    #[must_use]
    pub fn from_config(config: &CpeConfig) -> Self {
        Self {
            edge_error_x: config.edge_cluster_error_x * MICRONS_TO_CM,
            edge_error_y: config.edge_cluster_error_y * MICRONS_TO_CM,
            tables: ErrorTables::for_variant(ErrorTableVariant::from_config(config)),
            inflate: config.inflate_errors,
            inflate_without_angle: config.inflate_errors_ignoring_angle,
            strict: config.strict_errors,
        }
    }

    /// Tables used on the uncalibrated path.
    #[must_use]
    pub fn tables(&self) -> &ErrorTables {
        &self.tables
    }

    /// Computes the local error of a cluster.
    ///
    /// `calibration` must already be in local units. `track_known` tells
    /// whether a measured track direction was supplied.
    pub fn local_error(
        &self,
        cluster: &Cluster,
        unit: &DetectorUnit<'_>,
        calibration: Option<&CalibrationResult>,
        track_known: bool,
    ) -> Result<LocalError> {
        let inflate = self.inflate || (self.inflate_without_angle && !track_known);
        let topology = unit.topology;

        let x = AxisShape::of(cluster, topology, Axis::X);
        let y = AxisShape::of(cluster, topology, Axis::Y);
        let sigma_x = self.checked(Axis::X, self.axis_error(&x, unit, calibration, inflate))?;
        let sigma_y = self.checked(Axis::Y, self.axis_error(&y, unit, calibration, inflate))?;

        Ok(LocalError::from_sigmas(sigma_x, sigma_y))
    }

    fn edge_error(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.edge_error_x,
            Axis::Y => self.edge_error_y,
        }
    }

    fn axis_error(
        &self,
        shape: &AxisShape,
        unit: &DetectorUnit<'_>,
        calibration: Option<&CalibrationResult>,
        inflate: bool,
    ) -> f64 {
        if let Some(calibration) = calibration {
            if shape.edge {
                return self.edge_error(shape.axis);
            }
            let axis = calibration.axis(shape.axis);
            return if shape.size == 1 {
                axis.single_cell(shape.contains_big).sigma
            } else {
                axis.multi.sigma
            };
        }

        if inflate {
            let cells = usize::from(shape.size) + shape.big_cells_in_window(unit.topology);
            return cells as f64 * unit.topology.pitch(shape.axis) / 12f64.sqrt();
        }

        if shape.edge {
            self.edge_error(shape.axis)
        } else {
            self.tables.lookup(unit.region, shape.axis, shape.size)
        }
    }

    fn checked(&self, axis: Axis, value: f64) -> Result<f64> {
        if value > 0.0 {
            return Ok(value);
        }
        if self.strict {
            return Err(Error::NonPositiveError { axis, value });
        }
        log::warn!("accepting non-positive {axis} position error {value}");
        Ok(value)
    }
}
