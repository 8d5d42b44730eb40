//! Energy binning of the diffuse background model.
//!
//! The galactic diffuse cube is tabulated on 31 log-spaced energy edges from
//! 50 MeV to 600 GeV, giving 30 bins. A request for an arbitrary
//! `[E_min, E_max]` window is mapped onto a contiguous slice of those bins
//! and each bin gets an integration weight that converts intensity into
//! photon counts:
//!
//! ```text
//! weight_i = ΔE_i × T_live × A_eff(E_center_i)
//! ```
//!
//! The first and last bins only partly overlap the request. Their weights are
//! scaled by the fraction of an E^-2.5 differential flux (E^-1.5 integral)
//! that falls inside the request:
//!
//! ```text
//! f = (a^-1.5 - b^-1.5) / (lo^-1.5 - hi^-1.5)
//! ```
//!
//! where `[a, b]` is the overlapping sub-range of the native bin `[lo, hi]`.

use log::debug;

use crate::algo::logspace;
use crate::error::RangeError;

/// Lowest energy covered by the diffuse model (MeV)
pub const MIN_ENERGY_MEV: f64 = 50.0;

/// Highest energy covered by the diffuse model (MeV)
pub const MAX_ENERGY_MEV: f64 = 6.0e5;

/// Number of bin edges in the diffuse model energy grid
pub const N_EDGES: usize = 31;

/// Integrated spectral index used when splitting a bin
const POWER_LAW_INDEX: f64 = -1.5;

/// Check the requested window and live time before any file is touched.
pub fn validate_request(
    min_energy_mev: f64,
    max_energy_mev: f64,
    live_time_s: f64,
) -> Result<(), RangeError> {
    if min_energy_mev.is_nan() || min_energy_mev < MIN_ENERGY_MEV {
        return Err(RangeError::MinEnergyTooLow(min_energy_mev));
    }
    if max_energy_mev.is_nan() || max_energy_mev > MAX_ENERGY_MEV {
        return Err(RangeError::MaxEnergyTooHigh(max_energy_mev));
    }
    if min_energy_mev >= max_energy_mev {
        return Err(RangeError::EmptyWindow {
            min: min_energy_mev,
            max: max_energy_mev,
        });
    }
    if !live_time_s.is_finite() || live_time_s <= 0.0 {
        return Err(RangeError::InvalidLiveTime(live_time_s));
    }
    Ok(())
}

/// Log-spaced energy bin edges of the diffuse model
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
    /// Bin edges in MeV, strictly ascending
    edges: Vec<f64>,
}

impl Default for EnergyGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyGrid {
    /// The 31-edge grid from 50 MeV to 600 GeV
    pub fn new() -> Self {
        let mut edges = logspace(MIN_ENERGY_MEV.log10(), MAX_ENERGY_MEV.log10(), N_EDGES);
        // Pin the endpoints so boundary requests land on exact edges
        edges[0] = MIN_ENERGY_MEV;
        edges[N_EDGES - 1] = MAX_ENERGY_MEV;
        Self { edges }
    }

    /// Bin edges in MeV
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of energy bins (one less than the number of edges)
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Arithmetic mid-point of each bin in MeV
    pub fn centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect()
    }

    /// Width of bin `bin` in MeV
    pub fn width(&self, bin: usize) -> f64 {
        self.edges[bin + 1] - self.edges[bin]
    }

    /// Index of the first edge strictly above `energy`
    fn first_edge_above(&self, energy: f64) -> Option<usize> {
        self.edges.iter().position(|&edge| edge > energy)
    }

    /// Half-open bin range `[lo, hi)` covering `[min_energy, max_energy]`.
    ///
    /// `lo` is the bin containing `min_energy`. `hi` is the index of the
    /// first edge above `max_energy`, or the last bin when `max_energy` is
    /// at or beyond the top edge. The range is never empty.
    pub fn bin_range(&self, min_energy_mev: f64, max_energy_mev: f64) -> (usize, usize) {
        let n_bins = self.n_bins();

        let lo = match self.first_edge_above(min_energy_mev) {
            Some(idx) => idx.saturating_sub(1),
            None => n_bins - 1,
        };
        let mut hi = self.first_edge_above(max_energy_mev).unwrap_or(0);
        if hi == 0 {
            hi = n_bins;
        }
        if lo >= hi {
            hi = (lo + 1).min(n_bins);
        }

        (lo, hi)
    }

    /// Resolve a request into a bin range and per-bin integration weights.
    ///
    /// # Arguments
    ///
    /// * `min_energy_mev` / `max_energy_mev` - Requested window in MeV
    /// * `live_time_s` - Total integration time in seconds
    /// * `effective_area` - Effective area evaluated at every bin center
    ///   (length [`Self::n_bins`])
    pub fn window(
        &self,
        min_energy_mev: f64,
        max_energy_mev: f64,
        live_time_s: f64,
        effective_area: &[f64],
    ) -> EnergyWindow {
        assert_eq!(
            effective_area.len(),
            self.n_bins(),
            "Effective area must be sampled at every bin center"
        );

        let (lo, hi) = self.bin_range(min_energy_mev, max_energy_mev);
        let mut weights: Vec<f64> = (lo..hi).map(|bin| self.width(bin)).collect();

        let e = &self.edges;
        let last = weights.len() - 1;
        weights[0] *= power_law_fraction(min_energy_mev, e[lo + 1], e[lo], e[lo + 1]);
        weights[last] *= power_law_fraction(e[hi - 1], max_energy_mev, e[hi - 1], e[hi]);

        for (weight, &area) in weights.iter_mut().zip(&effective_area[lo..hi]) {
            *weight *= live_time_s * area;
        }

        debug!(
            "Energy window [{min_energy_mev}, {max_energy_mev}] MeV -> bins [{lo}, {hi}), weights {weights:?}"
        );

        EnergyWindow { lo, hi, weights }
    }
}

/// Fraction of a power-law flux in bin `[bin_lo, bin_hi]` that falls inside `[sub_lo, sub_hi]`
pub fn power_law_fraction(sub_lo: f64, sub_hi: f64, bin_lo: f64, bin_hi: f64) -> f64 {
    let k = POWER_LAW_INDEX;
    (sub_lo.powf(k) - sub_hi.powf(k)) / (bin_lo.powf(k) - bin_hi.powf(k))
}

/// Bins of the diffuse model selected for a request, with their weights
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyWindow {
    /// First included bin
    pub lo: usize,
    /// One past the last included bin
    pub hi: usize,
    /// Counts-per-intensity weight of each included bin, `weights[i]` for bin `lo + i`
    pub weights: Vec<f64>,
}

impl EnergyWindow {
    /// Number of bins in the window
    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    /// Always false; a window contains at least one bin
    pub fn is_empty(&self) -> bool {
        self.hi == self.lo
    }

    /// Iterate `(bin index, weight)` pairs
    pub fn bins(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (self.lo..self.hi).zip(self.weights.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_shape() {
        let grid = EnergyGrid::new();
        assert_eq!(grid.edges().len(), 31);
        assert_eq!(grid.n_bins(), 30);
        assert_eq!(grid.edges()[0], 50.0);
        assert_eq!(grid.edges()[30], 6.0e5);
        assert!(grid.edges().windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn test_centers_are_pairwise_means() {
        let grid = EnergyGrid::new();
        let centers = grid.centers();
        assert_eq!(centers.len(), 30);
        for (i, center) in centers.iter().enumerate() {
            let expected = (grid.edges()[i] + grid.edges()[i + 1]) / 2.0;
            assert_relative_eq!(*center, expected);
        }
    }

    #[test]
    fn test_full_range_selects_all_bins() {
        let grid = EnergyGrid::new();
        assert_eq!(grid.bin_range(50.0, 6.0e5), (0, 30));
    }

    #[test]
    fn test_interior_range() {
        let grid = EnergyGrid::new();
        let e = grid.edges().to_vec();

        // Slightly above edge 3 and slightly below edge 10
        let (lo, hi) = grid.bin_range(e[3] * 1.01, e[10] * 0.99);
        assert_eq!(lo, 3);
        assert_eq!(hi, 10);

        // Exactly on an edge belongs to the bin starting there
        let (lo, _) = grid.bin_range(e[5], e[12]);
        assert_eq!(lo, 5);
    }

    #[test]
    fn test_narrow_window_inside_one_bin() {
        let grid = EnergyGrid::new();
        let e = grid.edges().to_vec();
        let (lo, hi) = grid.bin_range(e[7] * 1.01, e[7] * 1.02);
        assert_eq!((lo, hi), (7, 8));
    }

    #[test]
    fn test_power_law_fraction_limits() {
        assert_relative_eq!(power_law_fraction(100.0, 200.0, 100.0, 200.0), 1.0);
        assert_relative_eq!(power_law_fraction(100.0, 100.0, 100.0, 200.0), 0.0);

        // Steep spectrum puts more flux in the lower half of the bin
        let lower = power_law_fraction(100.0, 150.0, 100.0, 200.0);
        let upper = power_law_fraction(150.0, 200.0, 100.0, 200.0);
        assert!(lower > upper);
        assert_relative_eq!(lower + upper, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_window_weights() {
        let grid = EnergyGrid::new();
        let area = vec![0.5; grid.n_bins()];
        let window = grid.window(50.0, 6.0e5, 10.0, &area);

        assert_eq!(window.len(), 30);
        for (bin, weight) in window.bins() {
            assert_relative_eq!(weight, grid.width(bin) * 10.0 * 0.5, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_partial_edge_bins_are_reweighted() {
        let grid = EnergyGrid::new();
        let e = grid.edges().to_vec();
        let area = vec![1.0; grid.n_bins()];

        let emin = (e[2] + e[3]) / 2.0;
        let emax = (e[8] + e[9]) / 2.0;
        let window = grid.window(emin, emax, 1.0, &area);

        assert_eq!((window.lo, window.hi), (2, 9));
        let first = power_law_fraction(emin, e[3], e[2], e[3]);
        let last = power_law_fraction(e[8], emax, e[8], e[9]);
        assert_relative_eq!(window.weights[0], grid.width(2) * first);
        assert_relative_eq!(window.weights[6], grid.width(8) * last);
        // Interior bins keep their full width
        assert_relative_eq!(window.weights[3], grid.width(5));
    }

    #[test]
    fn test_single_bin_gets_both_fractions() {
        let grid = EnergyGrid::new();
        let e = grid.edges().to_vec();
        let area = vec![1.0; grid.n_bins()];

        let emin = e[4] * 1.05;
        let emax = e[4] * 1.10;
        let window = grid.window(emin, emax, 1.0, &area);

        assert_eq!(window.len(), 1);
        let expected = grid.width(4)
            * power_law_fraction(emin, e[5], e[4], e[5])
            * power_law_fraction(e[4], emax, e[4], e[5]);
        assert_relative_eq!(window.weights[0], expected);
    }

    #[test]
    fn test_validate_request() {
        assert_eq!(
            validate_request(10.0, 1000.0, 1.0),
            Err(RangeError::MinEnergyTooLow(10.0))
        );
        assert_eq!(
            validate_request(100.0, 7.0e5, 1.0),
            Err(RangeError::MaxEnergyTooHigh(7.0e5))
        );
        assert!(matches!(
            validate_request(1000.0, 1000.0, 1.0),
            Err(RangeError::EmptyWindow { .. })
        ));
        assert_eq!(
            validate_request(100.0, 1000.0, 0.0),
            Err(RangeError::InvalidLiveTime(0.0))
        );
        assert!(validate_request(50.0, 6.0e5, 1.0).is_ok());
    }
}
