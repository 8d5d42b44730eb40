//! Li & Ma detection significance of photon clusters against the background.
//!
//! For each cluster the expected background inside its 95% containment
//! ellipse is taken from the [`SkyMap`], rescaled from the full live time to
//! the cluster's duration, and compared with 95% of the cluster's member
//! count using equation 17 of Li & Ma (1983):
//!
//! ```text
//! N_bg = integrated_rate × 2 × duration / live_time
//! N_cl = 0.95 × members
//! S²   = 2 [ N_cl ln(2 N_cl / (N_cl + N_bg)) + N_bg ln(2 N_bg / (N_cl + N_bg)) ]
//! ```
//!
//! The factor 2 in `N_bg` matches how the clustering stage reports durations
//! and must stay in step with it.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sky_map::SkyMap;

/// Fraction of a cluster's members inside its 95% containment ellipse
pub const CONTAINMENT_FRACTION: f64 = 0.95;

/// Rescaling between cluster duration and background exposure
const DURATION_SCALE: f64 = 2.0;

/// A photon cluster found by the upstream clustering stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Galactic longitude of the centroid (degrees)
    pub centroid_lon: f64,
    /// Galactic latitude of the centroid (degrees)
    pub centroid_lat: f64,
    /// 95% containment semi-major axis (degrees)
    pub size95_x: f64,
    /// 95% containment semi-minor axis (degrees)
    pub size95_y: f64,
    /// 95% containment duration (seconds)
    pub size95_t: f64,
    /// Number of photons in the cluster
    pub members: u64,
}

impl Region {
    /// Expected background photons for this cluster
    pub fn background_count(&self, map: &SkyMap, live_time_s: f64) -> f64 {
        let rate = map.integrated_rate(
            self.centroid_lon,
            self.centroid_lat,
            self.size95_x,
            self.size95_y,
        );
        rate * DURATION_SCALE * self.size95_t / live_time_s
    }

    /// Photons attributed to the cluster itself
    pub fn cluster_count(&self) -> f64 {
        CONTAINMENT_FRACTION * self.members as f64
    }
}

/// Li & Ma significance for on-source and background counts.
///
/// Returns 0 whenever either count carries no positive share of the total,
/// which also covers NaN inputs. Rounding below zero is clamped.
pub fn li_ma_significance(n_cluster: f64, n_background: f64) -> f64 {
    guarded_li_ma(n_cluster, n_background).unwrap_or(0.0)
}

/// Li & Ma significance, or `None` when the counts fail the positivity guard
fn guarded_li_ma(n_cluster: f64, n_background: f64) -> Option<f64> {
    let total = n_cluster + n_background;
    // NaN compares false, so degenerate totals fall through to None
    if !(n_cluster / total > 0.0 && n_background / total > 0.0) {
        return None;
    }
    let s2 = 2.0
        * (n_cluster * (2.0 * n_cluster / total).ln()
            + n_background * (2.0 * n_background / total).ln());
    Some(s2.max(0.0).sqrt())
}

/// Expected background photons for every region, in input order
pub fn background_counts(map: &SkyMap, live_time_s: f64, regions: &[Region]) -> Vec<f64> {
    regions
        .par_iter()
        .map(|region| region.background_count(map, live_time_s))
        .collect()
}

/// Significance of every region, in input order
pub fn significances(map: &SkyMap, live_time_s: f64, regions: &[Region]) -> Vec<f64> {
    let results = guarded_significances(map, live_time_s, regions);

    let degenerate = results.iter().filter(|sig| sig.is_none()).count();
    if degenerate > 0 {
        debug!(
            "{degenerate} of {} regions have degenerate counts, scored as zero",
            results.len()
        );
    }

    results.into_iter().map(|sig| sig.unwrap_or(0.0)).collect()
}

fn guarded_significances(
    map: &SkyMap,
    live_time_s: f64,
    regions: &[Region],
) -> Vec<Option<f64>> {
    regions
        .par_iter()
        .map(|region| {
            let n_bg = region.background_count(map, live_time_s);
            guarded_li_ma(region.cluster_count(), n_bg)
        })
        .collect()
}
