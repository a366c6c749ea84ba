#![allow(clippy::float_cmp)]
use approx::assert_relative_eq;
use pixcpe_algorithms::{
    generic_position, AxisProjection, ChargeWidthCuts, ClusterParameterEstimator, CpeStatistics,
    GenericCpe, HitEstimate,
};
use pixcpe_core::calibration::{
    ChargeBinErrors, ErrorBias, SingleCellErrors, Template, TemplateEntry, TemplateSet,
    TemplateStore, TemplateStrategy,
};
use pixcpe_core::cluster::{Cluster, PixelSample};
use pixcpe_core::config::CpeConfig;
use pixcpe_core::geometry::{
    DetectorRegion, DetectorUnit, MeasurementPoint, PixelTopology, TrackDirection,
};
use pixcpe_core::lorentz::LorentzParams;
use pixcpe_core::topology::RectangularTopology;
use std::collections::HashMap;

fn unit(topology: &RectangularTopology) -> DetectorUnit<'_> {
    DetectorUnit {
        id: 3,
        topology,
        region: DetectorRegion::Barrel { layer: 3 },
        local_bz: 3.8,
        nominal_direction: TrackDirection::default(),
    }
}

fn cluster(pixels: &[(u16, u16, f64)]) -> Cluster {
    Cluster::new(pixels.iter().map(|&(r, c, q)| PixelSample::new(r, c, q)).collect()).unwrap()
}

fn store() -> TemplateStore {
    let pair = |sigma, delta| ErrorBias { sigma, delta };
    let bin = ChargeBinErrors {
        x: pair(12.0, 0.5),
        y: pair(22.0, -0.5),
    };
    let set = TemplateSet {
        default_template: Some(5),
        module_templates: HashMap::new(),
        templates: vec![Template {
            id: 5,
            lorentz_width: None,
            entries: vec![TemplateEntry {
                cot_alpha: 0.0,
                cot_beta: 0.0,
                qavg: 25_000.0,
                pixmax: 12_000.0,
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
    TemplateStore::new(set, TemplateStrategy::Legacy).unwrap()
}

fn estimate(cpe: &GenericCpe, c: &Cluster, topology: &RectangularTopology, track: Option<TrackDirection>) -> HitEstimate {
    let mut stats = CpeStatistics::default();
    cpe.estimate(c, &unit(topology), track.as_ref(), &LorentzParams::default(), &mut stats)
        .unwrap()
}

#[test]
fn test_single_cell_position_ignores_charge() {
    let topology = RectangularTopology::default();
    let cpe = GenericCpe::new(CpeConfig::tabulated(), None).unwrap();
    let lower = topology.local_position(MeasurementPoint::new(40.0, 100.0));
    let upper = topology.local_position(MeasurementPoint::new(41.0, 101.0));

    for charge in [1.0, 900.0, 25_000.0, 1.0e6] {
        let hit = estimate(&cpe, &cluster(&[(40, 100, charge)]), &topology, Some(TrackDirection::new(0.4, -2.0)));
        assert_relative_eq!(hit.position.x, 0.5 * (lower.x + upper.x), epsilon = 1e-12);
        assert_relative_eq!(hit.position.y, 0.5 * (lower.y + upper.y), epsilon = 1e-12);
    }
}

#[test]
fn test_equal_edge_charges_give_geometric_center() {
    let topology = RectangularTopology::default();
    let cpe = GenericCpe::new(CpeConfig::tabulated(), None).unwrap();
    let boundary = topology.local_position(MeasurementPoint::new(21.0, 31.0));
    let c = cluster(&[(20, 30, 7000.0), (21, 31, 7000.0)]);

    for track in [None, Some(TrackDirection::new(0.0, 0.0)), Some(TrackDirection::new(0.3, 3.0))] {
        let hit = estimate(&cpe, &c, &topology, track);
        assert_relative_eq!(hit.position.x, boundary.x, epsilon = 1e-12);
        assert_relative_eq!(hit.position.y, boundary.y, epsilon = 1e-12);
    }
}

#[test]
fn test_fallback_width_ignores_predicted_width() {
    let cuts = ChargeWidthCuts {
        low: 0.0,
        high: 1.0,
        size_cut: 3.0,
    };
    let base = AxisProjection {
        size: 4,
        q_first: 50.0,
        q_last: 150.0,
        upper_edge_first: 100.0,
        lower_edge_last: 300.0,
        lorentz_width: 0.0,
        cot_angle: 0.0,
        pitch: 100.0,
        thickness: 285.0,
        first_is_big: false,
        last_is_big: true,
    };
    let expected = base.geom_center() + 0.5 * 0.5 * base.edge_width();

    for cot in [-3.0, -0.5, 0.0, 0.7, 4.0] {
        for lorentz_width in [-40.0, 0.0, 25.0] {
            let projection = AxisProjection {
                cot_angle: cot,
                lorentz_width,
                ..base
            };
            let result = generic_position(&projection, &cuts);
            assert!(result.used_edge);
            assert_relative_eq!(result.position, expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_worked_example_follows_cuts() {
    let projection = AxisProjection {
        size: 2,
        q_first: 100.0,
        q_last: 300.0,
        upper_edge_first: 0.0,
        lower_edge_last: 200.0,
        lorentz_width: 0.0,
        cot_angle: 0.0,
        pitch: 100.0,
        thickness: 285.0,
        first_is_big: false,
        last_is_big: false,
    };
    let accepting = ChargeWidthCuts {
        low: -3.0,
        high: 1.0,
        size_cut: 3.0,
    };
    let rejecting = ChargeWidthCuts {
        low: 0.0,
        high: 1.0,
        size_cut: 3.0,
    };
    assert_relative_eq!(generic_position(&projection, &accepting).position, 50.0, epsilon = 1e-12);
    assert_relative_eq!(generic_position(&projection, &rejecting).position, 125.0, epsilon = 1e-12);
}

#[test]
fn test_position_monotonic_in_charge_difference() {
    let topology = RectangularTopology::default();
    let cpe = GenericCpe::new(CpeConfig::tabulated(), None).unwrap();
    let track = Some(TrackDirection::new(0.1, 0.0));

    let mut previous = f64::NEG_INFINITY;
    for step in 0..=20 {
        let q_last = f64::from(step) * 500.0;
        let c = cluster(&[(60, 200, 10_000.0 - q_last), (61, 200, q_last)]);
        let hit = estimate(&cpe, &c, &topology, track);
        assert!(hit.position.x >= previous, "step {step}: {} < {previous}", hit.position.x);
        previous = hit.position.x;
    }
}

#[test]
fn test_edge_cluster_keeps_edge_error_with_calibration() {
    let topology = RectangularTopology::default();
    let cpe = GenericCpe::new(CpeConfig::default().with_edge_errors(50.0, 85.0), Some(store())).unwrap();
    let track = Some(TrackDirection::default());

    // First row touches the sensor edge, columns are interior.
    let hit = estimate(&cpe, &cluster(&[(0, 100, 9000.0), (1, 100, 9000.0)]), &topology, track);
    assert_relative_eq!(hit.error.xx, 50.0e-4 * 50.0e-4, epsilon = 1e-15);
    assert_relative_eq!(hit.error.yy, 43.0e-4 * 43.0e-4, epsilon = 1e-15);

    // Last column touches the sensor edge.
    let last_col = u16::try_from(topology.cols() - 1).unwrap();
    let hit = estimate(&cpe, &cluster(&[(30, last_col, 9000.0), (31, last_col, 9000.0)]), &topology, track);
    assert_relative_eq!(hit.error.xx, 12.0e-4 * 12.0e-4, epsilon = 1e-15);
    assert_relative_eq!(hit.error.yy, 85.0e-4 * 85.0e-4, epsilon = 1e-15);
    assert_eq!(hit.error.xy, 0.0);
}

#[test]
fn test_repeated_estimates_are_identical() {
    let topology = RectangularTopology::default();
    let cpe = GenericCpe::new(CpeConfig::default().with_bias_correction(true), Some(store())).unwrap();
    let c = cluster(&[(78, 50, 4000.0), (79, 50, 16_000.0), (80, 51, 9000.0)]);
    let track = Some(TrackDirection::new(0.2, 1.1));
    let lorentz = LorentzParams::new(0.0011, 0.0, 0.9);

    let mut stats = CpeStatistics::default();
    let first = cpe.estimate(&c, &unit(&topology), track.as_ref(), &lorentz, &mut stats).unwrap();
    let second = cpe.estimate(&c, &unit(&topology), track.as_ref(), &lorentz, &mut stats).unwrap();

    assert_eq!(first.position.x.to_bits(), second.position.x.to_bits());
    assert_eq!(first.position.y.to_bits(), second.position.y.to_bits());
    assert_eq!(first.error.xx.to_bits(), second.error.xx.to_bits());
    assert_eq!(first.error.yy.to_bits(), second.error.yy.to_bits());
    assert_eq!(first.qbin, second.qbin);
    assert_eq!(stats.hits_total, 2);
}
