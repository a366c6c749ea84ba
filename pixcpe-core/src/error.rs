//! Error types for pixcpe-core.

use crate::geometry::Axis;
use thiserror::Error;

/// Result type alias for pixcpe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for cluster parameter estimation.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Calibration templates failed validation.
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    /// No template is registered for the requested module.
    #[error("no calibration template for module {0}")]
    MissingTemplate(u32),

    /// A computed position error was not strictly positive.
    #[error("non-positive {axis} position error: {value}")]
    NonPositiveError { axis: Axis, value: f64 },

    /// Cluster without any pixels.
    #[error("cannot estimate parameters of an empty cluster")]
    EmptyCluster,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
