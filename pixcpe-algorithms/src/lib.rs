//! pixcpe-algorithms: Cluster parameter estimation for pixel detectors.
//!
//! This crate provides the generic charge-sharing estimator:
//! - **Edge charges** - single-pass first/last row and column sums
//! - **Position** - charge asymmetry times effective charge width
//! - **Lorentz** - drift offset and charge-width term
//! - **Errors** - calibrated, tabulated, edge and inflated errors
//!
#![warn(missing_docs)]

mod bias;
mod edge_charges;
mod error_model;
mod estimator;
mod lorentz;
mod position;
mod processing;

pub use bias::bias_correction;
pub use edge_charges::{collect_edge_charges, EdgeCharges};
pub use error_model::{ErrorModel, INFLATION_SCAN_COLS, INFLATION_SCAN_ROWS};
pub use estimator::{ClusterParameterEstimator, GenericCpe, HitEstimate};
pub use lorentz::AxisLorentz;
pub use position::{generic_position, AxisPosition, AxisProjection, ChargeWidthCuts};
pub use processing::{estimate_batch, estimate_sequential, ClusterRequest};

// Re-export core statistics
pub use pixcpe_core::statistics::CpeStatistics;
