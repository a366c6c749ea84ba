//! Run statistics for cluster parameter estimation.

use std::ops::AddAssign;

/// Counters accumulated while estimating hits.
///
/// Each worker owns its own counters; results are merged by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpeStatistics {
    /// Hits estimated.
    pub hits_total: u64,
    /// Axis projections that fell back to the average edge width.
    pub edge_fallbacks: u64,
}

impl CpeStatistics {
    /// Records one estimated hit.
    pub fn record_hit(&mut self) {
        self.hits_total += 1;
    }

    /// Records one edge-width fallback.
    pub fn record_edge_fallback(&mut self) {
        self.edge_fallbacks += 1;
    }

    /// Merges counters from another worker.
    pub fn merge(&mut self, other: &Self) {
        self.hits_total += other.hits_total;
        self.edge_fallbacks += other.edge_fallbacks;
    }

    /// Edge fallbacks per estimated hit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edge_fallback_rate(&self) -> f64 {
        if self.hits_total == 0 {
            0.0
        } else {
            self.edge_fallbacks as f64 / self.hits_total as f64
        }
    }
}

impl AddAssign for CpeStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_statistics() {
        let mut a = CpeStatistics::default();
        a.record_hit();
        a.record_edge_fallback();

        let mut b = CpeStatistics::default();
        b.record_hit();
        b.record_hit();

        a += b;
        assert_eq!(a.hits_total, 3);
        assert_eq!(a.edge_fallbacks, 1);
        assert!((a.edge_fallback_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert!(CpeStatistics::default().edge_fallback_rate().abs() < f64::EPSILON);
    }
}
