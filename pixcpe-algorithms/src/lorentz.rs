//! Lorentz drift correction along one axis.

/// Charge-width term and position offset derived from the Lorentz shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLorentz {
    /// Full drift shift along the axis.
    pub shift: f64,
    /// Width term consumed by the position formula.
    pub charge_width: f64,
    /// Offset added to the formula output (half the shift).
    pub offset: f64,
}

impl AxisLorentz {
    /// Derives the correction from the full shift and the configured width fraction.
    #[must_use]
    pub fn new(shift: f64, width_fraction: f64) -> Self {
        Self {
            shift,
            charge_width: shift * width_fraction,
            offset: 0.5 * shift,
        }
    }

    /// Replaces the width term with a calibrated charge width.
    ///
    /// Calibrations quote the width with the opposite sign to the drift shift.
    #[must_use]
    pub fn with_calibrated_width(mut self, calibrated: f64) -> Self {
        self.charge_width = -calibrated;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_width_and_offset() {
        let lorentz = AxisLorentz::new(0.01, 0.8);
        assert_relative_eq!(lorentz.charge_width, 0.008);
        assert_relative_eq!(lorentz.offset, 0.005);
    }

    #[test]
    fn test_calibrated_width_overrides_sign() {
        let lorentz = AxisLorentz::new(0.01, 0.8).with_calibrated_width(-0.003);
        assert_relative_eq!(lorentz.charge_width, 0.003);
        assert_relative_eq!(lorentz.offset, 0.005);
    }
}
