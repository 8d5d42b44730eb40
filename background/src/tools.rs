//! One-stop entry point: build a background map once, then query it.

use ndarray::{Array1, ArrayView1};

use crate::builder::{BackgroundMapBuilder, BackgroundRequest, ModelProducts};
use crate::config::BackgroundConfig;
use crate::error::BackgroundError;
use crate::significance::{self, Region};
use crate::sky_map::SkyMap;

/// A built background map together with the request that produced it.
///
/// Construction does all the work and is the only step that can fail; every
/// query afterwards is infallible.
///
/// ```no_run
/// use background::{BackgroundConfig, BackgroundRequest, BackgroundTools};
///
/// let request = BackgroundRequest::new(1000.0, 3.0e5, 4.8e7);
/// let tools = BackgroundTools::new(request, &BackgroundConfig::from_env())?;
/// let rate = tools.point_rate(120.0, 4.5);
/// # Ok::<(), background::BackgroundError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BackgroundTools {
    request: BackgroundRequest,
    map: SkyMap,
}

impl BackgroundTools {
    /// Load the configured model products and build the map
    pub fn new(
        request: BackgroundRequest,
        config: &BackgroundConfig,
    ) -> Result<Self, BackgroundError> {
        let map = BackgroundMapBuilder::from_config(config).build(&request, config)?;
        Ok(Self { request, map })
    }

    /// Build from products already in memory
    pub fn from_products(
        request: BackgroundRequest,
        builder: &BackgroundMapBuilder,
        products: &ModelProducts,
    ) -> Result<Self, BackgroundError> {
        let map = builder.build_from_products(&request, products)?;
        Ok(Self { request, map })
    }

    pub fn sky_map(&self) -> &SkyMap {
        &self.map
    }

    pub fn request(&self) -> &BackgroundRequest {
        &self.request
    }

    pub fn live_time(&self) -> f64 {
        self.request.live_time_s
    }

    /// Photons per square degree at a coordinate
    pub fn point_rate(&self, lon_deg: f64, lat_deg: f64) -> f64 {
        self.map.point_rate(lon_deg, lat_deg)
    }

    pub fn point_rates(&self, lon_deg: ArrayView1<f64>, lat_deg: ArrayView1<f64>) -> Array1<f64> {
        self.map.point_rates(lon_deg, lat_deg)
    }

    /// Photons per square degree averaged over five samples spaced by `eps_deg / 2`
    pub fn subsample_rate(&self, lon_deg: f64, lat_deg: f64, eps_deg: f64) -> f64 {
        self.map.subsample_rate(lon_deg, lat_deg, eps_deg)
    }

    pub fn subsample_rates(
        &self,
        lon_deg: ArrayView1<f64>,
        lat_deg: ArrayView1<f64>,
        eps_deg: f64,
    ) -> Array1<f64> {
        self.map.subsample_rates(lon_deg, lat_deg, eps_deg)
    }

    /// Expected photons inside an ellipse with the given semi-axes
    pub fn integrated_rate(
        &self,
        lon_deg: f64,
        lat_deg: f64,
        semi_major_deg: f64,
        semi_minor_deg: f64,
    ) -> f64 {
        self.map
            .integrated_rate(lon_deg, lat_deg, semi_major_deg, semi_minor_deg)
    }

    pub fn integrated_rates(
        &self,
        lon_deg: ArrayView1<f64>,
        lat_deg: ArrayView1<f64>,
        semi_major_deg: ArrayView1<f64>,
        semi_minor_deg: ArrayView1<f64>,
    ) -> Array1<f64> {
        self.map
            .integrated_rates(lon_deg, lat_deg, semi_major_deg, semi_minor_deg)
    }

    /// Expected background photons for each region
    pub fn background_counts(&self, regions: &[Region]) -> Vec<f64> {
        significance::background_counts(&self.map, self.live_time(), regions)
    }

    /// Li & Ma significance of each region
    pub fn significances(&self, regions: &[Region]) -> Vec<f64> {
        significance::significances(&self.map, self.live_time(), regions)
    }
}
