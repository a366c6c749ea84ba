//! Batch estimation over many clusters.

use crate::estimator::{ClusterParameterEstimator, HitEstimate};
use pixcpe_core::cluster::Cluster;
use pixcpe_core::error::Result;
use pixcpe_core::geometry::{DetectorUnit, TrackDirection};
use pixcpe_core::lorentz::LorentzParams;
use pixcpe_core::statistics::CpeStatistics;
use rayon::prelude::*;

/// One cluster together with the context it is estimated in.
#[derive(Debug, Clone, Copy)]
pub struct ClusterRequest<'a> {
    /// Cluster to estimate.
    pub cluster: &'a Cluster,
    /// Module the cluster belongs to.
    pub unit: DetectorUnit<'a>,
    /// Measured track direction, if any.
    pub track: Option<TrackDirection>,
    /// Lorentz drift of the module.
    pub lorentz: LorentzParams,
}

/// Estimates a batch of clusters in parallel.
///
/// Results keep the order of `requests`. Every cluster counts into its own
/// statistics, which are merged into `stats` in request order. The first
/// failing cluster, in request order, is returned as the error; `stats` then
/// holds only the clusters before it, matching [`estimate_sequential`].
pub fn estimate_batch<E>(
    estimator: &E,
    requests: &[ClusterRequest<'_>],
    stats: &mut CpeStatistics,
) -> Result<Vec<HitEstimate>>
where
    E: ClusterParameterEstimator + ?Sized,
{
    let outcomes: Vec<(Result<HitEstimate>, CpeStatistics)> = requests
        .par_iter()
        .map(|request| {
            let mut local = CpeStatistics::default();
            let hit = estimator.estimate(
                request.cluster,
                &request.unit,
                request.track.as_ref(),
                &request.lorentz,
                &mut local,
            );
            (hit, local)
        })
        .collect();

    let mut hits = Vec::with_capacity(outcomes.len());
    for (hit, local) in outcomes {
        let hit = hit?;
        stats.merge(&local);
        hits.push(hit);
    }
    Ok(hits)
}

/// Estimates a batch sequentially, in order.
pub fn estimate_sequential<E>(
    estimator: &E,
    requests: &[ClusterRequest<'_>],
    stats: &mut CpeStatistics,
) -> Result<Vec<HitEstimate>>
where
    E: ClusterParameterEstimator + ?Sized,
{
    requests
        .iter()
        .map(|request| {
            estimator.estimate(
                request.cluster,
                &request.unit,
                request.track.as_ref(),
                &request.lorentz,
                stats,
            )
        })
        .collect()
}
