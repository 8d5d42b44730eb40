//! Construction of the all-sky background photon map.
//!
//! The builder folds three model products into one [`SkyMap`]:
//!
//! 1. the galactic diffuse intensity cube, weighted per energy bin
//! 2. the isotropic spectrum, sampled at each bin center and weighted the same
//! 3. the exposure cube, resampled onto the diffuse pixel grid
//!
//! For every included bin `k` and pixel `p`:
//!
//! ```text
//! map[p] += (diffuse[k, p] × w_k + isotropic(E_k) × w_k) × exposure[k, p]
//! ```
//!
//! with `w_k` from [`EnergyGrid::window`]. Bins are summed in order for every
//! pixel, so identical inputs always give bit-identical maps.

use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;

use crate::config::{BackgroundConfig, ModelKind, ModelPaths};
use crate::energy::{validate_request, EnergyGrid, EnergyWindow};
use crate::error::{BackgroundError, DataFormatError, RangeError};
use crate::instrument::{ConversionType, EffectiveAreaCurve};
use crate::io::fits::read_cube;
use crate::io::isotropic::{read_isotropic, IsotropicSpectrum};
use crate::sky_map::SkyMap;

/// Output rows handed to each rayon task
const ROWS_PER_CHUNK: usize = 16;

/// Energy window and integration time of a background map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundRequest {
    pub min_energy_mev: f64,
    pub max_energy_mev: f64,
    pub live_time_s: f64,
}

impl BackgroundRequest {
    pub fn new(min_energy_mev: f64, max_energy_mev: f64, live_time_s: f64) -> Self {
        Self {
            min_energy_mev,
            max_energy_mev,
            live_time_s,
        }
    }

    /// Check the request against the energy range of the diffuse model
    pub fn validate(&self) -> Result<(), RangeError> {
        validate_request(self.min_energy_mev, self.max_energy_mev, self.live_time_s)
    }
}

/// The model products loaded into memory
#[derive(Debug, Clone)]
pub struct ModelProducts {
    /// Diffuse intensity, `[energy, lat, lon]`
    pub diffuse: Array3<f64>,
    pub isotropic: IsotropicSpectrum,
    /// Exposure, `[energy, lat, lon]`, at any pixel resolution
    pub exposure: Array3<f64>,
}

impl ModelProducts {
    /// Read all three products from resolved paths
    pub fn load(paths: &ModelPaths) -> Result<Self, BackgroundError> {
        info!("Loading diffuse model from {}", paths.diffuse.display());
        let diffuse = read_model_cube(ModelKind::Diffuse, &paths.diffuse)?;

        info!("Loading isotropic model from {}", paths.isotropic.display());
        let isotropic = read_isotropic(&paths.isotropic)?;

        info!("Loading exposure cube from {}", paths.exposure.display());
        let exposure = read_model_cube(ModelKind::Exposure, &paths.exposure)?;

        Ok(Self {
            diffuse,
            isotropic,
            exposure,
        })
    }
}

fn read_model_cube(
    model: ModelKind,
    path: &std::path::Path,
) -> Result<Array3<f64>, DataFormatError> {
    read_cube(path).map_err(|source| DataFormatError::Fits { model, source })
}

/// Resolve the configured paths and read every model product
pub fn load_products(config: &BackgroundConfig) -> Result<ModelProducts, BackgroundError> {
    let paths = config.resolve()?;
    ModelProducts::load(&paths)
}

/// Builds [`SkyMap`]s for one instrument response
#[derive(Debug, Clone)]
pub struct BackgroundMapBuilder {
    grid: EnergyGrid,
    effective_area: EffectiveAreaCurve,
    longitude_origin_deg: f64,
}

impl Default for BackgroundMapBuilder {
    fn default() -> Self {
        Self::new(ConversionType::default())
    }
}

impl BackgroundMapBuilder {
    /// Builder using the built-in effective area for `conversion`
    pub fn new(conversion: ConversionType) -> Self {
        Self {
            grid: EnergyGrid::new(),
            effective_area: EffectiveAreaCurve::for_conversion(conversion),
            longitude_origin_deg: 0.0,
        }
    }

    /// Builder matching the instrument settings of a configuration
    pub fn from_config(config: &BackgroundConfig) -> Self {
        Self::new(config.conversion).with_longitude_origin(config.longitude_origin_deg)
    }

    /// Replace the effective area with a custom curve
    pub fn with_effective_area(mut self, curve: EffectiveAreaCurve) -> Self {
        self.effective_area = curve;
        self
    }

    pub fn with_longitude_origin(mut self, origin_deg: f64) -> Self {
        self.longitude_origin_deg = origin_deg;
        self
    }

    pub fn grid(&self) -> &EnergyGrid {
        &self.grid
    }

    pub fn effective_area(&self) -> &EffectiveAreaCurve {
        &self.effective_area
    }

    /// Validate a request and resolve its bins and weights
    pub fn energy_window(&self, request: &BackgroundRequest) -> Result<EnergyWindow, RangeError> {
        request.validate()?;
        let area = self.effective_area.sample(&self.grid.centers());
        Ok(self.grid.window(
            request.min_energy_mev,
            request.max_energy_mev,
            request.live_time_s,
            &area,
        ))
    }

    /// Validate the request, load the configured products and build the map.
    ///
    /// The request is checked before any file is opened.
    pub fn build(
        &self,
        request: &BackgroundRequest,
        config: &BackgroundConfig,
    ) -> Result<SkyMap, BackgroundError> {
        request.validate()?;
        let products = load_products(config)?;
        self.build_from_products(request, &products)
    }

    /// Build the map from products already in memory
    pub fn build_from_products(
        &self,
        request: &BackgroundRequest,
        products: &ModelProducts,
    ) -> Result<SkyMap, BackgroundError> {
        let window = self.energy_window(request)?;
        check_cube(ModelKind::Diffuse, &products.diffuse, window.hi)?;
        check_cube(ModelKind::Exposure, &products.exposure, window.hi)?;

        let (_, rows, cols) = products.diffuse.dim();
        let (_, exposure_rows, exposure_cols) = products.exposure.dim();
        info!(
            "Building {rows}x{cols} background map: [{}, {}] MeV, {} s, bins [{}, {})",
            request.min_energy_mev,
            request.max_energy_mev,
            request.live_time_s,
            window.lo,
            window.hi
        );
        if (exposure_rows, exposure_cols) != (rows, cols) {
            debug!("Resampling exposure from {exposure_rows}x{exposure_cols} to {rows}x{cols}");
        }

        let centers = self.grid.centers();
        let isotropic_terms: Vec<f64> = window
            .bins()
            .map(|(bin, weight)| products.isotropic.at(centers[bin]) * weight)
            .collect();
        let exposure_row = nearest_indices(rows, exposure_rows);
        let exposure_col = nearest_indices(cols, exposure_cols);

        let mut total = Array2::<f64>::zeros((rows, cols));
        total
            .axis_chunks_iter_mut(Axis(0), ROWS_PER_CHUNK)
            .into_par_iter()
            .enumerate()
            .for_each(|(chunk_idx, mut chunk)| {
                let first_row = chunk_idx * ROWS_PER_CHUNK;
                for ((r, col), out) in chunk.indexed_iter_mut() {
                    let row = first_row + r;
                    let (er, ec) = (exposure_row[row], exposure_col[col]);

                    let mut sum = 0.0;
                    for ((bin, weight), &isotropic) in window.bins().zip(&isotropic_terms) {
                        let diffuse = products.diffuse[[bin, row, col]] * weight;
                        sum += (diffuse + isotropic) * products.exposure[[bin, er, ec]];
                    }
                    *out = sum;
                }
            });

        Ok(SkyMap::new(total).with_longitude_origin(self.longitude_origin_deg))
    }
}

/// Reject cubes with an empty sky axis or too few energy planes
fn check_cube(model: ModelKind, cube: &Array3<f64>, required: usize) -> Result<(), DataFormatError> {
    let (planes, rows, cols) = cube.dim();
    if rows == 0 {
        return Err(DataFormatError::EmptyAxis {
            model,
            axis: "latitude",
        });
    }
    if cols == 0 {
        return Err(DataFormatError::EmptyAxis {
            model,
            axis: "longitude",
        });
    }
    if planes < required {
        return Err(DataFormatError::TooFewPlanes {
            model,
            planes,
            required,
        });
    }
    Ok(())
}

/// Source index of the nearest pixel center for each of `dst_len` pixels
fn nearest_indices(dst_len: usize, src_len: usize) -> Vec<usize> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| (((i as f64 + 0.5) * scale) as usize).min(src_len - 1))
        .collect()
}
