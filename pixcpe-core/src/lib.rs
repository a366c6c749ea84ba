//! pixcpe-core: Core types for pixel cluster parameter estimation.
//!
//! This crate provides the cluster data model, the geometry and calibration
//! interfaces the estimator queries, configuration, and tabulated errors.
//!

pub mod calibration;
pub mod cluster;
pub mod config;
pub mod error;
pub mod error_tables;
pub mod geometry;
pub mod lorentz;
pub mod statistics;
pub mod topology;

pub use calibration::{
    AxisCalibration, CalibrationProvider, CalibrationQuery, CalibrationResult, ErrorBias,
    TemplateDbObject, TemplateSet, TemplateStore, TemplateStrategy, MICRONS_TO_CM,
};
pub use cluster::{Cluster, ClusterBounds, PixelSample};
pub use config::CpeConfig;
pub use error::{Error, Result};
pub use error_tables::{ErrorTableVariant, ErrorTables};
pub use geometry::{
    Axis, DetectorRegion, DetectorUnit, LocalError, LocalPoint, MeasurementPoint, PixelTopology,
    TrackDirection,
};
pub use lorentz::{LorentzInputs, LorentzModel, LorentzParams};
pub use statistics::CpeStatistics;
pub use topology::{RectangularTopology, SurfaceDeformation};
