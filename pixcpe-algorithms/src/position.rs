//! Charge-sharing position formula for one axis projection.
//!
//! The hit is placed at the geometric centre of the inner cells, shifted
//! towards the heavier edge by the charge asymmetry of the two edge cells
//! times half the effective charge width.

/// Cuts deciding when the geometric charge width is trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeWidthCuts {
    /// Minimum W_eff / pitch.
    pub low: f64,
    /// Maximum W_eff / pitch.
    pub high: f64,
    /// Sizes at or above this always use the edge-width fallback.
    pub size_cut: f64,
}

/// Inputs of the position formula along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisProjection {
    /// Cluster size along the axis, in cells.
    pub size: u16,
    /// Charge in the first cell row/column.
    pub q_first: f64,
    /// Charge in the last cell row/column.
    pub q_last: f64,
    /// Upper edge of the first cell.
    pub upper_edge_first: f64,
    /// Lower edge of the last cell.
    pub lower_edge_last: f64,
    /// Lorentz charge width.
    pub lorentz_width: f64,
    /// Cotangent of the incidence angle along the axis.
    pub cot_angle: f64,
    /// Nominal pitch along the axis.
    pub pitch: f64,
    /// Sensor thickness.
    pub thickness: f64,
    /// First cell is oversized.
    pub first_is_big: bool,
    /// Last cell is oversized.
    pub last_is_big: bool,
}

/// Position along one axis, before the Lorentz offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPosition {
    /// Position along the axis.
    pub position: f64,
    /// The average edge width replaced the geometric estimate.
    pub used_edge: bool,
}

impl AxisProjection {
    /// Midpoint of the inner region.
    #[must_use]
    pub fn geom_center(&self) -> f64 {
        0.5 * (self.upper_edge_first + self.lower_edge_last)
    }

    /// Width the track is expected to cover in the two edge cells.
    #[must_use]
    pub fn predicted_width(&self) -> f64 {
        self.thickness * self.cot_angle - self.lorentz_width
    }

    /// Average physical length of the two edge cells.
    #[must_use]
    pub fn edge_width(&self) -> f64 {
        let sum_of_edge = 2.0 + f64::from(u8::from(self.first_is_big)) + f64::from(u8::from(self.last_is_big));
        self.pitch * 0.5 * sum_of_edge
    }
}

/// Computes the hit position along one axis.
///
/// Units are whatever the caller uses consistently for lengths.
#[must_use]
pub fn generic_position(projection: &AxisProjection, cuts: &ChargeWidthCuts) -> AxisPosition {
    let geom_center = projection.geom_center();

    // A single cell carries no charge-sharing information.
    if projection.size == 1 {
        return AxisPosition {
            position: geom_center,
            used_edge: false,
        };
    }

    let w_inner = projection.lower_edge_last - projection.upper_edge_first;
    let w_pred = projection.predicted_width();
    let mut w_eff = w_pred.abs() - w_inner;

    let ratio = w_eff / projection.pitch;
    let used_edge = f64::from(projection.size) >= cuts.size_cut || ratio < cuts.low || ratio > cuts.high;
    if used_edge {
        w_eff = projection.edge_width();
    }

    let q_diff = projection.q_last - projection.q_first;
    let mut q_sum = projection.q_last + projection.q_first;
    // Both edge cells without charge: treat as unit charge.
    if q_sum == 0.0 {
        q_sum = 1.0;
    }

    let position = geom_center + 0.5 * (q_diff / q_sum) * w_eff;

    log::trace!(
        "size={} center={geom_center} w_inner={w_inner} w_pred={w_pred} w_eff={w_eff} edge={used_edge} pos={position}",
        projection.size
    );

    AxisPosition { position, used_edge }
}
