//! Pixel cluster types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single charge-collecting cell of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSample {
    /// Row index (local X).
    pub row: u16,
    /// Column index (local Y).
    pub col: u16,
    /// Collected charge (electrons or ADC counts).
    pub charge: f64,
}

impl PixelSample {
    /// Creates a new pixel sample.
    #[inline]
    #[must_use]
    pub fn new(row: u16, col: u16, charge: f64) -> Self {
        Self { row, col, charge }
    }
}

/// Bounding box of a cluster in cell indices (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterBounds {
    pub min_row: u16,
    pub max_row: u16,
    pub min_col: u16,
    pub max_col: u16,
}

impl ClusterBounds {
    /// Extent along rows, in cells.
    #[inline]
    #[must_use]
    pub fn size_x(&self) -> u16 {
        self.max_row - self.min_row + 1
    }

    /// Extent along columns, in cells.
    #[inline]
    #[must_use]
    pub fn size_y(&self) -> u16 {
        self.max_col - self.min_col + 1
    }
}

/// A connected group of pixels attributed to one particle crossing.
///
/// Pixel order carries no meaning. The bounding box is computed once at
/// construction; sizes reported by the upstream clusterizer are kept only
/// for consistency checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pixels: Vec<PixelSample>,
    bounds: ClusterBounds,
    reported_size: Option<(u16, u16)>,
}

impl Cluster {
    /// Creates a cluster from its pixels.
    pub fn new(pixels: Vec<PixelSample>) -> Result<Self> {
        let first = pixels.first().ok_or(Error::EmptyCluster)?;
        let mut bounds = ClusterBounds {
            min_row: first.row,
            max_row: first.row,
            min_col: first.col,
            max_col: first.col,
        };
        for pixel in &pixels[1..] {
            bounds.min_row = bounds.min_row.min(pixel.row);
            bounds.max_row = bounds.max_row.max(pixel.row);
            bounds.min_col = bounds.min_col.min(pixel.col);
            bounds.max_col = bounds.max_col.max(pixel.col);
        }

        Ok(Self {
            pixels,
            bounds,
            reported_size: None,
        })
    }

    /// Creates a cluster carrying the sizes reported by the clusterizer.
    pub fn with_reported_size(pixels: Vec<PixelSample>, size_x: u16, size_y: u16) -> Result<Self> {
        let mut cluster = Self::new(pixels)?;
        cluster.reported_size = Some((size_x, size_y));
        Ok(cluster)
    }

    /// Returns the pixels of the cluster.
    #[must_use]
    pub fn pixels(&self) -> &[PixelSample] {
        &self.pixels
    }

    /// Returns the number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Always false; empty clusters cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the bounding box.
    #[must_use]
    pub fn bounds(&self) -> ClusterBounds {
        self.bounds
    }

    /// Size along X in cells, from the bounding box.
    #[must_use]
    pub fn size_x(&self) -> u16 {
        self.bounds.size_x()
    }

    /// Size along Y in cells, from the bounding box.
    #[must_use]
    pub fn size_y(&self) -> u16 {
        self.bounds.size_y()
    }

    /// Sizes reported upstream, if any.
    #[must_use]
    pub fn reported_size(&self) -> Option<(u16, u16)> {
        self.reported_size
    }

    /// Total charge of the cluster.
    #[must_use]
    pub fn charge(&self) -> f64 {
        self.pixels.iter().map(|p| p.charge).sum()
    }

    /// Checks the reported sizes against the bounding box.
    ///
    /// A mismatch is logged and reported but never fatal.
    pub fn check_reported_size(&self) -> bool {
        let Some((size_x, size_y)) = self.reported_size else {
            return true;
        };
        let consistent = size_x == self.size_x() && size_y == self.size_y();
        if !consistent {
            log::warn!(
                "cluster size mismatch: reported {}x{}, bounding box {}x{}",
                size_x,
                size_y,
                self.size_x(),
                self.size_y()
            );
        }
        consistent
    }
}
