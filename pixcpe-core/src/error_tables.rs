//! Tabulated position errors by detector region and cluster size.
//!
//! Used when calibrated errors are unavailable. All values are in cm.

use crate::config::CpeConfig;
use crate::geometry::{Axis, DetectorRegion};

/// Errors indexed by cluster size (1-based), with a default for larger sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeTable {
    pub values: &'static [f64],
    pub default: f64,
}

impl SizeTable {
    /// Error for a cluster of `size` cells.
    #[must_use]
    pub fn lookup(&self, size: u16) -> f64 {
        usize::from(size)
            .checked_sub(1)
            .and_then(|index| self.values.get(index))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Tables for both axes of one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTables {
    pub x: SizeTable,
    pub y: SizeTable,
}

impl AxisTables {
    fn axis(&self, axis: Axis) -> &SizeTable {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

/// Which set of tables to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTableVariant {
    /// Present detector.
    Standard,
    /// High-radiation upgrade detector.
    Upgrade,
    /// Upgrade detector with small-pitch layer-1 sensors.
    SmallPitch,
}

impl ErrorTableVariant {
    /// Selects the variant requested by the configuration.
    #[must_use]
    pub fn from_config(config: &CpeConfig) -> Self {
        match (config.upgrade_sensor_tables, config.small_pitch_tables) {
            (true, true) => ErrorTableVariant::SmallPitch,
            (true, false) => ErrorTableVariant::Upgrade,
            (false, _) => ErrorTableVariant::Standard,
        }
    }
}

/// Region-keyed error tables, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorTables {
    pub barrel_layer1: AxisTables,
    pub barrel_outer: AxisTables,
    pub forward: AxisTables,
}

const STANDARD_BARREL: AxisTables = AxisTables {
    x: SizeTable {
        values: &[0.00115, 0.00120, 0.00088],
        default: 0.01030,
    },
    y: SizeTable {
        values: &[
            0.00375, 0.00230, 0.00250, 0.00250, 0.00230, 0.00230, 0.00210, 0.00210, 0.00240,
        ],
        default: 0.00210,
    },
};

const STANDARD_FORWARD: AxisTables = AxisTables {
    x: SizeTable {
        values: &[0.0020, 0.0020],
        default: 0.0020,
    },
    y: SizeTable {
        values: &[0.00210],
        default: 0.00075,
    },
};

const UPGRADE_BARREL: AxisTables = AxisTables {
    x: SizeTable {
        values: &[0.00114, 0.00104, 0.00214],
        default: 0.00425,
    },
    y: SizeTable {
        values: &[
            0.00299, 0.00203, 0.0023, 0.00237, 0.00233, 0.00243, 0.00232, 0.00259, 0.00176,
        ],
        default: 0.00245,
    },
};

const UPGRADE_FORWARD: AxisTables = AxisTables {
    x: SizeTable {
        values: &[0.00151, 0.000_813, 0.00221],
        default: 0.00218,
    },
    y: SizeTable {
        values: &[0.00261, 0.00107, 0.00264],
        default: 0.00357,
    },
};

const SMALL_PITCH_LAYER1: AxisTables = AxisTables {
    x: SizeTable {
        values: &[0.00104, 0.000_691, 0.00122],
        default: 0.00321,
    },
    y: SizeTable {
        values: &[
            0.00199, 0.00136, 0.0015, 0.00153, 0.00152, 0.00171, 0.00154, 0.00157, 0.00154,
        ],
        default: 0.00164,
    },
};

impl ErrorTables {
    /// Returns the tables for a variant.
    #[must_use]
    pub fn for_variant(variant: ErrorTableVariant) -> Self {
        match variant {
            ErrorTableVariant::Standard => Self {
                barrel_layer1: STANDARD_BARREL,
                barrel_outer: STANDARD_BARREL,
                forward: STANDARD_FORWARD,
            },
            ErrorTableVariant::Upgrade => Self {
                barrel_layer1: UPGRADE_BARREL,
                barrel_outer: UPGRADE_BARREL,
                forward: UPGRADE_FORWARD,
            },
            ErrorTableVariant::SmallPitch => Self {
                barrel_layer1: SMALL_PITCH_LAYER1,
                barrel_outer: UPGRADE_BARREL,
                forward: UPGRADE_FORWARD,
            },
        }
    }

    /// Tables for a detector region.
    #[must_use]
    pub fn region(&self, region: DetectorRegion) -> &AxisTables {
        match region {
            DetectorRegion::Barrel { layer: 1 } => &self.barrel_layer1,
            DetectorRegion::Barrel { .. } => &self.barrel_outer,
            DetectorRegion::Forward { .. } => &self.forward,
        }
    }

    /// Tabulated error for a region, axis and cluster size.
    #[must_use]
    pub fn lookup(&self, region: DetectorRegion, axis: Axis, size: u16) -> f64 {
        self.region(region).axis(axis).lookup(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_within_and_beyond_table() {
        let tables = ErrorTables::for_variant(ErrorTableVariant::Standard);
        let layer1 = DetectorRegion::Barrel { layer: 1 };
        assert!((tables.lookup(layer1, Axis::X, 1) - 0.00115).abs() < 1e-12);
        assert!((tables.lookup(layer1, Axis::X, 3) - 0.00088).abs() < 1e-12);
        assert!((tables.lookup(layer1, Axis::X, 4) - 0.01030).abs() < 1e-12);
        assert!((tables.lookup(layer1, Axis::Y, 9) - 0.00240).abs() < 1e-12);
        assert!((tables.lookup(layer1, Axis::Y, 10) - 0.00210).abs() < 1e-12);

        let forward = DetectorRegion::Forward { disk: 2 };
        assert!((tables.lookup(forward, Axis::Y, 1) - 0.00210).abs() < 1e-12);
        assert!((tables.lookup(forward, Axis::Y, 2) - 0.00075).abs() < 1e-12);
    }

    #[test]
    fn test_small_pitch_only_changes_layer1() {
        let tables = ErrorTables::for_variant(ErrorTableVariant::SmallPitch);
        let layer1 = DetectorRegion::Barrel { layer: 1 };
        let layer3 = DetectorRegion::Barrel { layer: 3 };
        assert!((tables.lookup(layer1, Axis::X, 2) - 0.000_691).abs() < 1e-12);
        assert!((tables.lookup(layer3, Axis::X, 2) - 0.00104).abs() < 1e-12);
    }

    #[test]
    fn test_variant_from_config() {
        let mut config = CpeConfig::tabulated();
        assert_eq!(ErrorTableVariant::from_config(&config), ErrorTableVariant::Standard);
        config.upgrade_sensor_tables = true;
        assert_eq!(ErrorTableVariant::from_config(&config), ErrorTableVariant::Upgrade);
        config.small_pitch_tables = true;
        assert_eq!(ErrorTableVariant::from_config(&config), ErrorTableVariant::SmallPitch);
    }
}
