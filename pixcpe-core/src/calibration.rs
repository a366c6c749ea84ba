//! Calibration provider interface and template store.
//!
//! Templates are precomputed per module type and incidence angle. A lookup
//! returns the expected position error and bias for the cluster's charge
//! bin. Template values are in micrometres; [`CalibrationResult::to_local_units`]
//! converts them to centimetres.

use crate::config::CpeConfig;
use crate::error::{Error, Result};
use crate::geometry::{Axis, TrackDirection};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Conversion factor from micrometres to centimetres.
pub const MICRONS_TO_CM: f64 = 1.0e-4;

/// Charge-ratio thresholds separating the four charge bins.
const CHARGE_BIN_EDGES: [f64; 3] = [1.5, 1.0, 0.85];

/// Position error and bias pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorBias {
    pub sigma: f64,
    pub delta: f64,
}

impl ErrorBias {
    fn scaled(self, factor: f64) -> Self {
        Self {
            sigma: self.sigma * factor,
            delta: self.delta * factor,
        }
    }

    fn mirrored(self, sign: f64) -> Self {
        Self {
            sigma: self.sigma,
            delta: self.delta * sign,
        }
    }
}

/// Calibrated quantities along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisCalibration {
    /// Error and bias of multi-cell clusters.
    pub multi: ErrorBias,
    /// Error and bias of single-cell clusters on a normal cell.
    pub single: ErrorBias,
    /// Error and bias of single-cell clusters on an oversized cell.
    pub single_big: ErrorBias,
    /// Calibrated charge width, in the calibration's sign convention.
    pub charge_width: Option<f64>,
}

impl AxisCalibration {
    /// Single-cell pair for a normal or oversized cell.
    #[must_use]
    pub fn single_cell(&self, big: bool) -> ErrorBias {
        if big {
            self.single_big
        } else {
            self.single
        }
    }

    fn scaled(self, factor: f64) -> Self {
        Self {
            multi: self.multi.scaled(factor),
            single: self.single.scaled(factor),
            single_big: self.single_big.scaled(factor),
            charge_width: self.charge_width.map(|w| w * factor),
        }
    }
}

/// Result of one calibration lookup.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationResult {
    /// Charge bin identifier.
    pub qbin: u8,
    /// Pixel charge ceiling for truncation.
    pub truncation_ceiling: f64,
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

impl CalibrationResult {
    /// Converts all lengths from micrometres to centimetres.
    #[must_use]
    pub fn to_local_units(&self) -> Self {
        Self {
            qbin: self.qbin,
            truncation_ceiling: self.truncation_ceiling,
            x: self.x.scaled(MICRONS_TO_CM),
            y: self.y.scaled(MICRONS_TO_CM),
        }
    }

    /// Calibration for one axis.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisCalibration {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

/// Inputs of a calibration lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationQuery {
    /// Module whose template is used.
    pub module_id: u32,
    /// Local track direction.
    pub track: TrackDirection,
    /// Local field component normal to the sensor (tesla).
    pub local_bz: f64,
    /// Total cluster charge.
    pub cluster_charge: f64,
}

/// Trait for calibration providers.
///
/// Providers are read concurrently and never mutated by a lookup.
pub trait CalibrationProvider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &'static str;

    /// Looks up the calibration for a cluster.
    fn calibrate(&self, query: &CalibrationQuery) -> Result<CalibrationResult>;
}

/// Error and bias of each axis in one charge bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeBinErrors {
    pub x: ErrorBias,
    pub y: ErrorBias,
}

/// Single-cell pairs for normal and oversized cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleCellErrors {
    pub normal: ErrorBias,
    pub big: ErrorBias,
}

/// Template values at one incidence angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub cot_alpha: f64,
    pub cot_beta: f64,
    /// Average cluster charge at this angle.
    pub qavg: f64,
    /// Pixel charge ceiling.
    pub pixmax: f64,
    /// Multi-cell errors for each charge bin.
    pub bins: [ChargeBinErrors; 4],
    pub single_x: SingleCellErrors,
    pub single_y: SingleCellErrors,
}

/// All entries of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: u32,
    /// Calibrated charge widths along X and Y (µm). Required by light templates.
    #[serde(default)]
    pub lorentz_width: Option<[f64; 2]>,
    pub entries: Vec<TemplateEntry>,
}

impl Template {
    /// Entry closest to the given angles.
    fn nearest(&self, cot_alpha: f64, cot_beta: f64) -> Option<&TemplateEntry> {
        let distance = |entry: &TemplateEntry| {
            let da = entry.cot_alpha - cot_alpha;
            let db = entry.cot_beta - cot_beta;
            da * da + db * db
        };
        self.entries
            .iter()
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
    }
}

/// Serialized template collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateSet {
    /// Template used for modules absent from `module_templates`.
    #[serde(default)]
    pub default_template: Option<u32>,
    /// Module id → template id.
    #[serde(default)]
    pub module_templates: HashMap<u32, u32>,
    pub templates: Vec<Template>,
}

/// Template payload handed over by a conditions database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDbObject {
    pub version: u32,
    pub payload: TemplateSet,
}

/// Validated templates with an id index.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    set: TemplateSet,
    index: HashMap<u32, usize>,
}

impl TemplateLibrary {
    fn new(set: TemplateSet, strategy: TemplateStrategy) -> Result<Self> {
        if set.templates.is_empty() {
            return Err(Error::InvalidCalibration("no templates".to_string()));
        }

        let mut index = HashMap::with_capacity(set.templates.len());
        for (position, template) in set.templates.iter().enumerate() {
            if index.insert(template.id, position).is_some() {
                return Err(Error::InvalidCalibration(format!(
                    "duplicate template id {}",
                    template.id
                )));
            }
            validate_template(template, strategy)?;
        }

        let referenced: HashSet<u32> = set
            .module_templates
            .values()
            .copied()
            .chain(set.default_template)
            .collect();
        if let Some(missing) = referenced.iter().find(|id| !index.contains_key(*id)) {
            return Err(Error::InvalidCalibration(format!(
                "reference to unknown template {missing}"
            )));
        }

        Ok(Self { set, index })
    }

    /// Underlying template set.
    #[must_use]
    pub fn set(&self) -> &TemplateSet {
        &self.set
    }

    fn template_for(&self, module_id: u32) -> Result<&Template> {
        let template_id = self
            .set
            .module_templates
            .get(&module_id)
            .copied()
            .or(self.set.default_template)
            .ok_or(Error::MissingTemplate(module_id))?;
        self.index
            .get(&template_id)
            .map(|&position| &self.set.templates[position])
            .ok_or(Error::MissingTemplate(module_id))
    }
}

fn validate_template(template: &Template, strategy: TemplateStrategy) -> Result<()> {
    let invalid = |what: &str| {
        Err(Error::InvalidCalibration(format!(
            "template {}: {what}",
            template.id
        )))
    };

    if template.entries.is_empty() {
        return invalid("no entries");
    }
    if strategy == TemplateStrategy::Light && template.lorentz_width.is_none() {
        return invalid("light templates need a Lorentz width");
    }

    let positive = |v: f64| v.is_finite() && v > 0.0;
    for entry in &template.entries {
        if !entry.cot_alpha.is_finite() || !entry.cot_beta.is_finite() {
            return invalid("non-finite angle");
        }
        if !positive(entry.qavg) || !positive(entry.pixmax) {
            return invalid("non-positive charge scale");
        }
        let sigmas = entry
            .bins
            .iter()
            .flat_map(|bin| [bin.x.sigma, bin.y.sigma])
            .chain([
                entry.single_x.normal.sigma,
                entry.single_x.big.sigma,
                entry.single_y.normal.sigma,
                entry.single_y.big.sigma,
            ]);
        if !sigmas.into_iter().all(positive) {
            return invalid("non-positive error");
        }
    }
    Ok(())
}

/// Charge bin from the ratio of cluster charge to the template average.
#[allow(clippy::cast_possible_truncation)]
fn charge_bin(ratio: f64) -> u8 {
    CHARGE_BIN_EDGES
        .iter()
        .position(|&edge| ratio > edge)
        .map_or(3, |bin| bin as u8)
}

/// Template flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStrategy {
    /// Full templates.
    Legacy,
    /// Simplified templates that also carry calibrated charge widths.
    Light,
}

impl TemplateStrategy {
    /// Strategy requested by the configuration.
    #[must_use]
    pub fn from_config(config: &CpeConfig) -> Self {
        if config.use_legacy_calibration {
            TemplateStrategy::Legacy
        } else {
            TemplateStrategy::Light
        }
    }
}

/// Template-based calibration provider.
#[derive(Debug, Clone)]
pub enum TemplateStore {
    Legacy(TemplateLibrary),
    Light(TemplateLibrary),
}

impl TemplateStore {
    /// Validates a template set and wraps it for the given strategy.
    pub fn new(set: TemplateSet, strategy: TemplateStrategy) -> Result<Self> {
        let library = TemplateLibrary::new(set, strategy)?;
        Ok(match strategy {
            TemplateStrategy::Legacy => TemplateStore::Legacy(library),
            TemplateStrategy::Light => TemplateStore::Light(library),
        })
    }

    /// Reads a JSON template set.
    pub fn from_reader<R: Read>(reader: R, strategy: TemplateStrategy) -> Result<Self> {
        let set: TemplateSet = serde_json::from_reader(reader)?;
        Self::new(set, strategy)
    }

    /// Reads a JSON template file.
    pub fn from_file<P: AsRef<Path>>(path: P, strategy: TemplateStrategy) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let store = Self::from_reader(BufReader::new(file), strategy)?;
        log::debug!(
            "loaded {} templates from {}",
            store.library().set.templates.len(),
            path.as_ref().display()
        );
        Ok(store)
    }

    /// Builds the store from a database payload.
    pub fn from_db_object(object: &TemplateDbObject, strategy: TemplateStrategy) -> Result<Self> {
        Self::new(object.payload.clone(), strategy).map_err(|err| match err {
            Error::InvalidCalibration(msg) => Error::InvalidCalibration(format!(
                "database object version {}: {msg}",
                object.version
            )),
            other => other,
        })
    }

    /// Strategy of this store.
    #[must_use]
    pub fn strategy(&self) -> TemplateStrategy {
        match self {
            TemplateStore::Legacy(_) => TemplateStrategy::Legacy,
            TemplateStore::Light(_) => TemplateStrategy::Light,
        }
    }

    /// Validated templates.
    #[must_use]
    pub fn library(&self) -> &TemplateLibrary {
        match self {
            TemplateStore::Legacy(library) | TemplateStore::Light(library) => library,
        }
    }
}

impl CalibrationProvider for TemplateStore {
    fn name(&self) -> &'static str {
        match self {
            TemplateStore::Legacy(_) => "LegacyTemplate",
            TemplateStore::Light(_) => "LightTemplate",
        }
    }

    fn calibrate(&self, query: &CalibrationQuery) -> Result<CalibrationResult> {
        let template = self.library().template_for(query.module_id)?;

        // Templates are generated for a positive field; mirror X otherwise.
        let sign = if query.local_bz < 0.0 { -1.0 } else { 1.0 };
        let entry = template
            .nearest(sign * query.track.cot_alpha, query.track.cot_beta)
            .ok_or_else(|| {
                Error::InvalidCalibration(format!("template {} has no entries", template.id))
            })?;

        let qbin = charge_bin(query.cluster_charge / entry.qavg);
        let bin = &entry.bins[usize::from(qbin)];
        let widths = match self {
            TemplateStore::Legacy(_) => None,
            TemplateStore::Light(_) => template.lorentz_width,
        };

        Ok(CalibrationResult {
            qbin,
            truncation_ceiling: entry.pixmax,
            x: AxisCalibration {
                multi: bin.x.mirrored(sign),
                single: entry.single_x.normal.mirrored(sign),
                single_big: entry.single_x.big.mirrored(sign),
                charge_width: widths.map(|[wx, _]| sign * wx),
            },
            y: AxisCalibration {
                multi: bin.y,
                single: entry.single_y.normal,
                single_big: entry.single_y.big,
                charge_width: widths.map(|[_, wy]| wy),
            },
        })
    }
}
