//! Geometry types and the pixel topology interface.
//!
//! Local-frame quantities are in centimetres. Measurement-frame quantities
//! are in cell-index units, with `row` running along the local X axis and
//! `col` along the local Y axis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local measurement axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Local X (rows).
    X,
    /// Local Y (columns).
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Point in the module's local frame (cm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
}

impl LocalPoint {
    /// Creates a new local point.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point in the measurement frame (fractional cell indices).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementPoint {
    pub row: f64,
    pub col: f64,
}

impl MeasurementPoint {
    /// Creates a new measurement point.
    #[inline]
    #[must_use]
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

/// Diagonal-capable local error matrix (variances in cm²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalError {
    pub xx: f64,
    pub xy: f64,
    pub yy: f64,
}

impl LocalError {
    /// Builds an uncorrelated error from per-axis standard deviations.
    #[must_use]
    pub fn from_sigmas(sigma_x: f64, sigma_y: f64) -> Self {
        Self {
            xx: sigma_x * sigma_x,
            xy: 0.0,
            yy: sigma_y * sigma_y,
        }
    }
}

/// Local track direction expressed as cotangents of the incidence angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackDirection {
    /// cot(alpha), projection on the local X axis.
    pub cot_alpha: f64,
    /// cot(beta), projection on the local Y axis.
    pub cot_beta: f64,
}

impl TrackDirection {
    /// Creates a new track direction.
    #[inline]
    #[must_use]
    pub fn new(cot_alpha: f64, cot_beta: f64) -> Self {
        Self {
            cot_alpha,
            cot_beta,
        }
    }

    /// Returns the cotangent for the given axis.
    #[inline]
    #[must_use]
    pub fn cot(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.cot_alpha,
            Axis::Y => self.cot_beta,
        }
    }
}

/// Detector region a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorRegion {
    /// Barrel module on the given layer (1 = innermost).
    Barrel { layer: u8 },
    /// Forward (endcap) module on the given disk.
    Forward { disk: u8 },
}

impl DetectorRegion {
    /// Returns true for barrel modules.
    #[must_use]
    pub fn is_barrel(&self) -> bool {
        matches!(self, DetectorRegion::Barrel { .. })
    }
}

/// Trait for pixel module topologies.
///
/// The estimator only queries the topology; it never builds one.
pub trait PixelTopology: Send + Sync {
    /// Cell pitch along local X (cm).
    fn pitch_x(&self) -> f64;

    /// Cell pitch along local Y (cm).
    fn pitch_y(&self) -> f64;

    /// Sensor thickness (cm).
    fn thickness(&self) -> f64;

    /// Returns true if the row lies on the boundary of the sensitive area.
    fn is_edge_x(&self, row: u16) -> bool;

    /// Returns true if the column lies on the boundary of the sensitive area.
    fn is_edge_y(&self, col: u16) -> bool;

    /// Returns true if the row is an oversized cell.
    fn is_big_x(&self, row: u16) -> bool;

    /// Returns true if the column is an oversized cell.
    fn is_big_y(&self, col: u16) -> bool;

    /// Returns true if any row in `lo..=hi` is an oversized cell.
    fn contains_big_x(&self, lo: u16, hi: u16) -> bool {
        (lo..=hi).any(|row| self.is_big_x(row))
    }

    /// Returns true if any column in `lo..=hi` is an oversized cell.
    fn contains_big_y(&self, lo: u16, hi: u16) -> bool {
        (lo..=hi).any(|col| self.is_big_y(col))
    }

    /// Maps a measurement point to the local frame.
    fn local_position(&self, point: MeasurementPoint) -> LocalPoint;

    /// Maps a measurement point to the local frame, correcting for surface
    /// deformations along the given track direction.
    fn local_position_along(&self, point: MeasurementPoint, _track: &TrackDirection) -> LocalPoint {
        self.local_position(point)
    }

    /// Pitch along the given axis.
    fn pitch(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.pitch_x(),
            Axis::Y => self.pitch_y(),
        }
    }
}

/// A detector module as seen by the estimator.
#[derive(Clone, Copy)]
pub struct DetectorUnit<'a> {
    /// Module identifier, used to resolve calibration templates.
    pub id: u32,
    /// Module topology.
    pub topology: &'a dyn PixelTopology,
    /// Region of the detector the module sits in.
    pub region: DetectorRegion,
    /// Local magnetic field component normal to the sensor (tesla).
    pub local_bz: f64,
    /// Direction assumed when no track direction is supplied
    /// (straight line from the nominal interaction point).
    pub nominal_direction: TrackDirection,
}

impl fmt::Debug for DetectorUnit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorUnit")
            .field("id", &self.id)
            .field("region", &self.region)
            .field("local_bz", &self.local_bz)
            .field("nominal_direction", &self.nominal_direction)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_error_from_sigmas() {
        let err = LocalError::from_sigmas(0.002, 0.003);
        assert!((err.xx - 4.0e-6).abs() < 1e-15);
        assert!((err.yy - 9.0e-6).abs() < 1e-15);
        assert!(err.xy.abs() < f64::EPSILON);
    }

    #[test]
    fn test_track_direction_axis() {
        let dir = TrackDirection::new(0.1, -2.0);
        assert!((dir.cot(Axis::X) - 0.1).abs() < f64::EPSILON);
        assert!((dir.cot(Axis::Y) + 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_region_serde() {
        let region: DetectorRegion = serde_json::from_str(r#"{"barrel":{"layer":2}}"#).unwrap();
        assert_eq!(region, DetectorRegion::Barrel { layer: 2 });
        assert!(region.is_barrel());

        let region: DetectorRegion = serde_json::from_str(r#"{"forward":{"disk":1}}"#).unwrap();
        assert!(!region.is_barrel());
    }
}
