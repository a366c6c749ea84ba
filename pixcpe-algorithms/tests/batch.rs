use pixcpe_algorithms::{
    estimate_batch, estimate_sequential, ClusterParameterEstimator, ClusterRequest, CpeStatistics,
    GenericCpe,
};
use pixcpe_core::calibration::{
    ChargeBinErrors, ErrorBias, SingleCellErrors, Template, TemplateEntry, TemplateSet,
    TemplateStore, TemplateStrategy,
};
use pixcpe_core::cluster::{Cluster, PixelSample};
use pixcpe_core::config::CpeConfig;
use pixcpe_core::geometry::{DetectorRegion, DetectorUnit, TrackDirection};
use pixcpe_core::lorentz::LorentzParams;
use pixcpe_core::topology::RectangularTopology;
use pixcpe_core::Error;
use std::collections::HashMap;

/// Deterministic spread of clusters over the module, some of them on the edges.
fn generate_clusters(count: u16) -> Vec<Cluster> {
    (0..count)
        .map(|i| {
            let row = (i * 7) % 159;
            let col = (i * 13) % 414;
            let size = 1 + i % 4;
            let pixels = (0..size)
                .map(|k| PixelSample::new(row + k % 2, col + k / 2, 2000.0 + f64::from((i * 37 + k * 11) % 90) * 100.0))
                .collect();
            Cluster::new(pixels).unwrap()
        })
        .collect()
}

fn requests<'a>(clusters: &'a [Cluster], topology: &'a RectangularTopology) -> Vec<ClusterRequest<'a>> {
    clusters
        .iter()
        .enumerate()
        .map(|(i, cluster)| ClusterRequest {
            cluster,
            unit: DetectorUnit {
                id: u32::try_from(i % 3).unwrap(),
                topology,
                region: if i % 2 == 0 {
                    DetectorRegion::Barrel { layer: 1 }
                } else {
                    DetectorRegion::Forward { disk: 2 }
                },
                local_bz: 3.8,
                nominal_direction: TrackDirection::new(0.05, 0.5),
            },
            track: (i % 5 != 0).then(|| TrackDirection::new(0.1, f64::from(u32::try_from(i % 7).unwrap()) * 0.4)),
            lorentz: LorentzParams::new(0.001, 0.0, 1.0),
        })
        .collect()
}

fn store(module_templates: HashMap<u32, u32>, default_template: Option<u32>) -> TemplateStore {
    let pair = |sigma, delta| ErrorBias { sigma, delta };
    let bin = ChargeBinErrors {
        x: pair(14.0, 1.0),
        y: pair(24.0, 1.0),
    };
    let set = TemplateSet {
        default_template,
        module_templates,
        templates: vec![Template {
            id: 1,
            lorentz_width: Some([-20.0, 0.0]),
            entries: vec![TemplateEntry {
                cot_alpha: 0.0,
                cot_beta: 0.0,
                qavg: 15_000.0,
                pixmax: 9_000.0,
                bins: [bin; 4],
                single_x: SingleCellErrors {
                    normal: pair(28.0, 0.0),
                    big: pair(40.0, 0.0),
                },
                single_y: SingleCellErrors {
                    normal: pair(43.0, 0.0),
                    big: pair(60.0, 0.0),
                },
            }],
        }],
    };
    TemplateStore::new(set, TemplateStrategy::Light).unwrap()
}

#[test]
fn test_batch_matches_sequential() {
    let topology = RectangularTopology::default();
    let clusters = generate_clusters(500);
    let requests = requests(&clusters, &topology);
    let cpe = GenericCpe::new(CpeConfig::default().with_legacy_calibration(false), Some(store(HashMap::new(), Some(1)))).unwrap();

    let mut batch_stats = CpeStatistics::default();
    let batch = estimate_batch(&cpe, &requests, &mut batch_stats).unwrap();
    let mut sequential_stats = CpeStatistics::default();
    let sequential = estimate_sequential(&cpe, &requests, &mut sequential_stats).unwrap();

    assert_eq!(batch.len(), clusters.len());
    assert_eq!(batch, sequential);
    assert_eq!(batch_stats, sequential_stats);
    assert_eq!(batch_stats.hits_total, 500);
}

#[test]
fn test_batch_through_trait_object() {
    let topology = RectangularTopology::default();
    let clusters = generate_clusters(64);
    let requests = requests(&clusters, &topology);
    let cpe = GenericCpe::new(CpeConfig::tabulated(), None).unwrap();
    let estimator: &dyn ClusterParameterEstimator = &cpe;

    let mut stats = CpeStatistics::default();
    let hits = estimate_batch(estimator, &requests, &mut stats).unwrap();

    assert_eq!(estimator.name(), "Generic");
    assert_eq!(hits.len(), 64);
    assert!(hits.iter().all(|hit| hit.qbin.is_none()));
    assert!(hits.iter().all(|hit| hit.error.xx > 0.0 && hit.error.yy > 0.0));
    assert!(stats.edge_fallbacks <= 2 * stats.hits_total);
}

#[test]
fn test_statistics_accumulate_across_batches() {
    let topology = RectangularTopology::default();
    let clusters = generate_clusters(40);
    let requests = requests(&clusters, &topology);
    let cpe = GenericCpe::new(CpeConfig::tabulated(), None).unwrap();

    let mut stats = CpeStatistics::default();
    estimate_batch(&cpe, &requests, &mut stats).unwrap();
    let after_one = stats;
    estimate_batch(&cpe, &requests, &mut stats).unwrap();

    assert_eq!(stats.hits_total, 2 * after_one.hits_total);
    assert_eq!(stats.edge_fallbacks, 2 * after_one.edge_fallbacks);
}

#[test]
fn test_missing_template_fails_batch() {
    let topology = RectangularTopology::default();
    let clusters = generate_clusters(30);
    let requests = requests(&clusters, &topology);
    // Only modules 0 and 1 have a template and there is no default.
    let modules = HashMap::from([(0, 1), (1, 1)]);
    let cpe = GenericCpe::new(CpeConfig::default(), Some(store(modules, None))).unwrap();

    let mut stats = CpeStatistics::default();
    let result = estimate_batch(&cpe, &requests, &mut stats);
    assert!(matches!(result, Err(Error::MissingTemplate(2))));
}

#[test]
fn test_failing_batch_counts_like_sequential() {
    let topology = RectangularTopology::default();
    let clusters = generate_clusters(30);
    let requests = requests(&clusters, &topology);
    let modules = HashMap::from([(0, 1), (1, 1)]);
    let cpe = GenericCpe::new(CpeConfig::default(), Some(store(modules, None))).unwrap();

    let mut batch_stats = CpeStatistics::default();
    let batch = estimate_batch(&cpe, &requests, &mut batch_stats);
    let mut sequential_stats = CpeStatistics::default();
    let sequential = estimate_sequential(&cpe, &requests, &mut sequential_stats);

    assert!(matches!(batch, Err(Error::MissingTemplate(2))));
    assert!(matches!(sequential, Err(Error::MissingTemplate(2))));
    // Only the two clusters ahead of the failing one are counted.
    assert_eq!(batch_stats, sequential_stats);
    assert_eq!(batch_stats.hits_total, 2);
}
