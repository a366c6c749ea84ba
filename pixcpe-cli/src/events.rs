//! JSON event files: module descriptions, clusters and estimated hits.

use pixcpe_algorithms::{ClusterParameterEstimator, ClusterRequest, CpeStatistics, GenericCpe, HitEstimate};
use pixcpe_core::cluster::{Cluster, PixelSample};
use pixcpe_core::geometry::{DetectorRegion, DetectorUnit, TrackDirection};
use pixcpe_core::lorentz::{LorentzInputs, LorentzParams};
use pixcpe_core::topology::RectangularTopology;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{CliError, Result};

/// One detector module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleRecord {
    pub id: u32,
    pub region: DetectorRegion,
    #[serde(default)]
    pub topology: RectangularTopology,
    #[serde(default)]
    pub lorentz: LorentzInputs,
    #[serde(default)]
    pub nominal_direction: TrackDirection,
}

/// One cluster as read from the event file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRecord {
    pub module: u32,
    pub pixels: Vec<PixelSample>,
    #[serde(default)]
    pub track: Option<TrackDirection>,
    #[serde(default)]
    pub size_x: Option<u16>,
    #[serde(default)]
    pub size_y: Option<u16>,
}

/// Contents of an event file.
#[derive(Debug, Clone, Deserialize)]
pub struct EventFile {
    pub modules: Vec<ModuleRecord>,
    pub clusters: Vec<ClusterRecord>,
}

impl EventFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Estimated hit as written to the output file.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HitRecord {
    pub module: u32,
    pub x: f64,
    pub y: f64,
    pub xx: f64,
    pub xy: f64,
    pub yy: f64,
    pub qbin: Option<u8>,
    /// The X position used the average edge width.
    pub used_edge_x: bool,
    /// The Y position used the average edge width.
    pub used_edge_y: bool,
}

impl HitRecord {
    fn new(module: u32, hit: &HitEstimate) -> Self {
        Self {
            module,
            x: hit.position.x,
            y: hit.position.y,
            xx: hit.error.xx,
            xy: hit.error.xy,
            yy: hit.error.yy,
            qbin: hit.qbin,
            used_edge_x: hit.used_edge.0,
            used_edge_y: hit.used_edge.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StatisticsRecord {
    pub hits_total: u64,
    pub edge_fallbacks: u64,
    pub edge_fallback_rate: f64,
}

impl From<&CpeStatistics> for StatisticsRecord {
    fn from(stats: &CpeStatistics) -> Self {
        Self {
            hits_total: stats.hits_total,
            edge_fallbacks: stats.edge_fallbacks,
            edge_fallback_rate: stats.edge_fallback_rate(),
        }
    }
}

/// Output file contents.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    pub estimator: String,
    pub hits: Vec<HitRecord>,
    pub statistics: StatisticsRecord,
}

/// Estimates every cluster of an event file.
pub fn estimate_events(cpe: &GenericCpe, events: &EventFile) -> Result<EstimateReport> {
    for module in &events.modules {
        module.topology.validate()?;
    }
    let modules: HashMap<u32, &ModuleRecord> = events.modules.iter().map(|m| (m.id, m)).collect();

    let clusters = events
        .clusters
        .iter()
        .map(|record| match (record.size_x, record.size_y) {
            (Some(sx), Some(sy)) => Cluster::with_reported_size(record.pixels.clone(), sx, sy),
            _ => Cluster::new(record.pixels.clone()),
        })
        .collect::<pixcpe_core::Result<Vec<_>>>()?;

    let mut lorentz_cache: HashMap<u32, LorentzParams> = HashMap::with_capacity(modules.len());
    let mut requests = Vec::with_capacity(clusters.len());
    for (record, cluster) in events.clusters.iter().zip(&clusters) {
        let module = modules
            .get(&record.module)
            .copied()
            .ok_or(CliError::UnknownModule(record.module))?;
        let unit = DetectorUnit {
            id: module.id,
            topology: &module.topology,
            region: module.region,
            local_bz: module.lorentz.local_field[2],
            nominal_direction: module.nominal_direction,
        };
        let lorentz = *lorentz_cache
            .entry(module.id)
            .or_insert_with(|| cpe.lorentz_params(&module.lorentz, &unit));
        requests.push(ClusterRequest {
            cluster,
            unit,
            track: record.track,
            lorentz,
        });
    }

    let mut stats = CpeStatistics::default();
    let hits = pixcpe_algorithms::estimate_batch(cpe, &requests, &mut stats)?;
    log::info!(
        "estimated {} hits, {} edge fallbacks",
        stats.hits_total,
        stats.edge_fallbacks
    );

    Ok(EstimateReport {
        estimator: cpe.name().to_string(),
        hits: events
            .clusters
            .iter()
            .zip(&hits)
            .map(|(record, hit)| HitRecord::new(record.module, hit))
            .collect(),
        statistics: StatisticsRecord::from(&stats),
    })
}
