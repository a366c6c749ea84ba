//! Rectangular pixel module topology.
//!
//! A module is tiled by readout chips. The two cells on either side of an
//! internal chip boundary are oversized (twice the nominal pitch), and the
//! first and last cell along each axis are edge cells.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::error::{Error, Result};
use crate::geometry::{LocalPoint, MeasurementPoint, PixelTopology, TrackDirection};
use serde::{Deserialize, Serialize};

/// Bowing of the sensor surface, described by its sagitta along each axis (cm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceDeformation {
    /// Sagitta along X.
    pub sagitta_x: f64,
    /// Sagitta along Y.
    pub sagitta_y: f64,
}

impl SurfaceDeformation {
    /// Height of the surface above the nominal plane at local (u, v).
    #[must_use]
    pub fn height(&self, u: f64, v: f64, length_x: f64, length_y: f64) -> f64 {
        let ru = 2.0 * u / length_x;
        let rv = 2.0 * v / length_y;
        self.sagitta_x * (1.0 - ru * ru) + self.sagitta_y * (1.0 - rv * rv)
    }
}

/// Module made of `chips_x` × `chips_y` readout chips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangularTopology {
    /// Nominal pitch along X (cm).
    pub pitch_x: f64,
    /// Nominal pitch along Y (cm).
    pub pitch_y: f64,
    /// Sensor thickness (cm).
    pub thickness: f64,
    /// Rows per readout chip.
    pub rows_per_chip: u16,
    /// Columns per readout chip.
    pub cols_per_chip: u16,
    /// Number of chips along X.
    pub chips_x: u16,
    /// Number of chips along Y.
    pub chips_y: u16,
    /// Optional surface bow, applied when a track direction is known.
    pub deformation: Option<SurfaceDeformation>,
}

impl Default for RectangularTopology {
    fn default() -> Self {
        Self {
            pitch_x: 0.0100,
            pitch_y: 0.0150,
            thickness: 0.0285,
            rows_per_chip: 80,
            cols_per_chip: 52,
            chips_x: 2,
            chips_y: 8,
            deformation: None,
        }
    }
}

/// Cell layout along one axis.
#[derive(Debug, Clone, Copy)]
struct AxisLayout {
    pitch: f64,
    per_chip: u32,
    chips: u32,
}

impl AxisLayout {
    fn cells(self) -> u32 {
        self.per_chip * self.chips
    }

    /// Number of extra pitches contributed by the internal chip boundaries.
    fn extra_cells(self) -> u32 {
        2 * self.chips.saturating_sub(1)
    }

    fn length(self) -> f64 {
        f64::from(self.cells() + self.extra_cells()) * self.pitch
    }

    fn is_edge(self, index: u32) -> bool {
        index == 0 || index + 1 == self.cells()
    }

    fn is_big(self, index: u32) -> bool {
        let n = self.cells();
        if index >= n || self.per_chip == 0 {
            return false;
        }
        let within = index % self.per_chip;
        (within + 1 == self.per_chip && index + 1 != n) || (within == 0 && index != 0)
    }

    /// Oversized cells with an index strictly below `index`.
    fn big_below(self, index: u32) -> u32 {
        (1..self.chips)
            .map(|k| {
                let boundary = k * self.per_chip;
                u32::from(boundary - 1 < index) + u32::from(boundary < index)
            })
            .sum()
    }

    fn local(self, m: f64) -> f64 {
        let n = self.cells();
        let half = 0.5 * self.length();
        if m < 0.0 {
            return m * self.pitch - half;
        }
        if m >= f64::from(n) {
            let past = m - f64::from(n);
            return (f64::from(n + self.extra_cells()) + past) * self.pitch - half;
        }
        let index = m.floor() as u32;
        let frac = m - f64::from(index);
        let lower = f64::from(index + self.big_below(index));
        let width = if self.is_big(index) { 2.0 } else { 1.0 };
        (lower + frac * width) * self.pitch - half
    }
}

impl RectangularTopology {
    /// Creates a topology with the given pitch and thickness and default chip layout.
    #[must_use]
    pub fn new(pitch_x: f64, pitch_y: f64, thickness: f64) -> Self {
        Self {
            pitch_x,
            pitch_y,
            thickness,
            ..Self::default()
        }
    }

    /// Set the chip layout.
    #[must_use]
    pub fn with_chips(mut self, rows_per_chip: u16, cols_per_chip: u16, chips_x: u16, chips_y: u16) -> Self {
        self.rows_per_chip = rows_per_chip;
        self.cols_per_chip = cols_per_chip;
        self.chips_x = chips_x;
        self.chips_y = chips_y;
        self
    }

    /// Set the surface deformation.
    #[must_use]
    pub fn with_deformation(mut self, deformation: SurfaceDeformation) -> Self {
        self.deformation = Some(deformation);
        self
    }

    /// Checks that the layout describes a physical module.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(self.pitch_x) && positive(self.pitch_y)) {
            return Err(Error::Config(format!(
                "pitch must be positive: ({}, {})",
                self.pitch_x, self.pitch_y
            )));
        }
        if !positive(self.thickness) {
            return Err(Error::Config(format!(
                "thickness must be positive: {}",
                self.thickness
            )));
        }
        if self.rows_per_chip == 0 || self.cols_per_chip == 0 || self.chips_x == 0 || self.chips_y == 0 {
            return Err(Error::Config("chip layout has no cells".to_string()));
        }
        if self.rows() > u32::from(u16::MAX) + 1 || self.cols() > u32::from(u16::MAX) + 1 {
            return Err(Error::Config("chip layout exceeds the cell index range".to_string()));
        }
        if let Some(d) = self.deformation {
            if !(d.sagitta_x.is_finite() && d.sagitta_y.is_finite()) {
                return Err(Error::Config("non-finite surface deformation".to_string()));
            }
        }
        Ok(())
    }

    /// Number of rows on the module.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.layout_x().cells()
    }

    /// Number of columns on the module.
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.layout_y().cells()
    }

    /// Physical module length along X (cm).
    #[must_use]
    pub fn length_x(&self) -> f64 {
        self.layout_x().length()
    }

    /// Physical module length along Y (cm).
    #[must_use]
    pub fn length_y(&self) -> f64 {
        self.layout_y().length()
    }

    fn layout_x(&self) -> AxisLayout {
        AxisLayout {
            pitch: self.pitch_x,
            per_chip: u32::from(self.rows_per_chip),
            chips: u32::from(self.chips_x),
        }
    }

    fn layout_y(&self) -> AxisLayout {
        AxisLayout {
            pitch: self.pitch_y,
            per_chip: u32::from(self.cols_per_chip),
            chips: u32::from(self.chips_y),
        }
    }
}

impl PixelTopology for RectangularTopology {
    fn pitch_x(&self) -> f64 {
        self.pitch_x
    }

    fn pitch_y(&self) -> f64 {
        self.pitch_y
    }

    fn thickness(&self) -> f64 {
        self.thickness
    }

    fn is_edge_x(&self, row: u16) -> bool {
        self.layout_x().is_edge(u32::from(row))
    }

    fn is_edge_y(&self, col: u16) -> bool {
        self.layout_y().is_edge(u32::from(col))
    }

    fn is_big_x(&self, row: u16) -> bool {
        self.layout_x().is_big(u32::from(row))
    }

    fn is_big_y(&self, col: u16) -> bool {
        self.layout_y().is_big(u32::from(col))
    }

    fn local_position(&self, point: MeasurementPoint) -> LocalPoint {
        LocalPoint::new(self.layout_x().local(point.row), self.layout_y().local(point.col))
    }

    fn local_position_along(&self, point: MeasurementPoint, track: &TrackDirection) -> LocalPoint {
        let nominal = self.local_position(point);
        let Some(deformation) = self.deformation else {
            return nominal;
        };
        let dz = deformation.height(nominal.x, nominal.y, self.length_x(), self.length_y());
        LocalPoint::new(nominal.x - dz * track.cot_alpha, nominal.y - dz * track.cot_beta)
    }
}
