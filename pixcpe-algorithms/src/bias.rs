//! Irradiation bias correction.

use pixcpe_core::calibration::AxisCalibration;

/// Amount to subtract from a position along one axis.
///
/// Single-cell biases already include the Lorentz drift, so the half shift
/// added by the corrector is taken back out for them. `last_is_big` refers
/// to the cell at the upper bound of the cluster.
#[must_use]
pub fn bias_correction(size: u16, lorentz_shift: f64, last_is_big: bool, calibration: &AxisCalibration) -> f64 {
    if size == 1 {
        0.5 * lorentz_shift + calibration.single_cell(last_is_big).delta
    } else {
        calibration.multi.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pixcpe_core::calibration::ErrorBias;

    fn calibration() -> AxisCalibration {
        AxisCalibration {
            multi: ErrorBias { sigma: 1.0, delta: 0.3 },
            single: ErrorBias { sigma: 1.0, delta: 0.1 },
            single_big: ErrorBias { sigma: 1.0, delta: 0.2 },
            charge_width: None,
        }
    }

    #[test]
    fn test_single_cell_uses_single_bias() {
        assert_relative_eq!(bias_correction(1, 0.04, false, &calibration()), 0.12);
        assert_relative_eq!(bias_correction(1, 0.04, true, &calibration()), 0.22);
    }

    #[test]
    fn test_multi_cell_uses_multi_bias() {
        assert_relative_eq!(bias_correction(4, 0.04, true, &calibration()), 0.3);
    }
}
