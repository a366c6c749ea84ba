//! Edge charge collection.

use pixcpe_core::cluster::Cluster;

/// Charge in the first and last cell rows/columns of a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeCharges {
    /// Charge at the minimum row.
    pub first_x: f64,
    /// Charge at the maximum row.
    pub last_x: f64,
    /// Charge at the minimum column.
    pub first_y: f64,
    /// Charge at the maximum column.
    pub last_y: f64,
}

/// Sums the charge on the four edges of the bounding box in one pass.
///
/// A corner pixel contributes to both of its edges. When `ceiling` is set,
/// each pixel charge is capped before it is added.
#[must_use]
pub fn collect_edge_charges(cluster: &Cluster, ceiling: Option<f64>) -> EdgeCharges {
    let bounds = cluster.bounds();
    let mut charges = EdgeCharges::default();

    for pixel in cluster.pixels() {
        let q = ceiling.map_or(pixel.charge, |max| pixel.charge.min(max));

        if pixel.row == bounds.min_row {
            charges.first_x += q;
        }
        if pixel.row == bounds.max_row {
            charges.last_x += q;
        }
        if pixel.col == bounds.min_col {
            charges.first_y += q;
        }
        if pixel.col == bounds.max_col {
            charges.last_y += q;
        }
    }

    charges
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use pixcpe_core::cluster::PixelSample;

    fn l_shaped() -> Cluster {
        Cluster::new(vec![
            PixelSample::new(10, 5, 100.0),
            PixelSample::new(11, 5, 200.0),
            PixelSample::new(12, 5, 300.0),
            PixelSample::new(12, 6, 400.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_edge_sums() {
        let charges = collect_edge_charges(&l_shaped(), None);
        assert_eq!(charges.first_x, 100.0);
        assert_eq!(charges.last_x, 700.0);
        assert_eq!(charges.first_y, 600.0);
        assert_eq!(charges.last_y, 400.0);
    }

    #[test]
    fn test_truncation_caps_each_pixel() {
        let charges = collect_edge_charges(&l_shaped(), Some(250.0));
        assert_eq!(charges.first_x, 100.0);
        assert_eq!(charges.last_x, 500.0);
        assert_eq!(charges.first_y, 550.0);
        assert_eq!(charges.last_y, 250.0);
    }

    #[test]
    fn test_single_pixel_counts_everywhere() {
        let cluster = Cluster::new(vec![PixelSample::new(3, 3, 42.0)]).unwrap();
        let charges = collect_edge_charges(&cluster, None);
        assert_eq!(charges.first_x, 42.0);
        assert_eq!(charges.last_x, 42.0);
        assert_eq!(charges.first_y, 42.0);
        assert_eq!(charges.last_y, 42.0);
    }

    #[test]
    fn test_order_independent() {
        let mut pixels = l_shaped().pixels().to_vec();
        pixels.reverse();
        let reversed = Cluster::new(pixels).unwrap();
        assert_eq!(
            collect_edge_charges(&reversed, None),
            collect_edge_charges(&l_shaped(), None)
        );
    }
}
