//! Background map builder and cluster significance scorer
//!
//! Builds the diffuse background map for an energy window and live time,
//! then either scores a JSON list of clusters, reports the background at a
//! single coordinate, or both. The built map can be saved as a FITS image.
//!
//! Usage:
//! ```
//! cargo run --release --bin cluster_significance -- \
//!     --emin 1000 --emax 300000 --live-time 1.5e8 --regions clusters.json
//! ```
//!
//! The regions file holds an array of objects with `centroid_lon`,
//! `centroid_lat`, `size95_x`, `size95_y`, `size95_t` and `members`.
//! Results are printed to stdout as JSON.
//!
//! See --help for detailed options.

use anyhow::{bail, Context, Result};
use background::{
    write_sky_map, BackgroundConfig, BackgroundRequest, BackgroundTools, ConversionType, Region,
};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Command line arguments for the significance tool
#[derive(Parser, Debug)]
#[command(
    name = "Cluster Significance",
    about = "Builds a Fermi-LAT diffuse background map and scores photon clusters against it",
    long_about = None
)]
struct Args {
    /// Lower edge of the energy window in MeV (at least 50)
    #[arg(long)]
    emin: f64,

    /// Upper edge of the energy window in MeV (at most 600000)
    #[arg(long)]
    emax: f64,

    /// Total live time of the observation in seconds
    #[arg(long)]
    live_time: f64,

    /// Galactic diffuse model cube (defaults to the FERMI_DIR installation)
    #[arg(long)]
    diffuse_model: Option<PathBuf>,

    /// Isotropic spectrum table (defaults to the FERMI_DIR installation)
    #[arg(long)]
    isotropic_model: Option<PathBuf>,

    /// Exposure cube (defaults to the FERMI_DIR installation)
    #[arg(long)]
    exposure_cube: Option<PathBuf>,

    /// Fermi science tools installation; overrides the FERMI_DIR variable
    #[arg(long)]
    fermi_dir: Option<PathBuf>,

    /// Tracker conversion type: front, back or both
    #[arg(long, default_value_t = ConversionType::Both)]
    conversion: ConversionType,

    /// Longitude of the first map column in degrees (-180 for gll_iem maps)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    longitude_origin: f64,

    /// JSON file with the clusters to score
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Write the built map to this FITS file
    #[arg(long)]
    output_map: Option<PathBuf>,

    /// Galactic longitude for a single background lookup
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Galactic latitude for a single background lookup
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
}

impl Args {
    fn config(&self) -> BackgroundConfig {
        let mut config = BackgroundConfig::from_env()
            .with_conversion(self.conversion)
            .with_longitude_origin(self.longitude_origin);
        if let Some(dir) = &self.fermi_dir {
            config = config.with_fermi_dir(dir);
        }
        if let Some(path) = &self.diffuse_model {
            config = config.with_diffuse_model(path);
        }
        if let Some(path) = &self.isotropic_model {
            config = config.with_isotropic_model(path);
        }
        if let Some(path) = &self.exposure_cube {
            config = config.with_exposure_cube(path);
        }
        config
    }
}

#[derive(Serialize)]
struct PointReport {
    lon: f64,
    lat: f64,
    rate_per_deg2: f64,
}

#[derive(Serialize)]
struct RegionReport {
    #[serde(flatten)]
    region: Region,
    background_counts: f64,
    significance: f64,
}

#[derive(Serialize)]
struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    point: Option<PointReport>,
    regions: Vec<RegionReport>,
}

fn read_regions(path: &Path) -> Result<Vec<Region>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read regions from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse regions in {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.regions.is_none() && args.output_map.is_none() && args.lon.is_none() {
        bail!("Nothing to do: pass --regions, --output-map or --lon/--lat");
    }

    let request = BackgroundRequest::new(args.emin, args.emax, args.live_time);
    let tools = BackgroundTools::new(request, &args.config())
        .context("Failed to build the background map")?;
    let (rows, cols) = tools.sky_map().dims();
    info!("Background map ready: {rows}x{cols} pixels");

    if let Some(path) = &args.output_map {
        write_sky_map(tools.sky_map().data(), path)
            .with_context(|| format!("Failed to write map to {}", path.display()))?;
        info!("Wrote background map to {}", path.display());
    }

    let point = match (args.lon, args.lat) {
        (Some(lon), Some(lat)) => Some(PointReport {
            lon,
            lat,
            rate_per_deg2: tools.point_rate(lon, lat),
        }),
        _ => None,
    };

    let regions = match &args.regions {
        Some(path) => read_regions(path)?,
        None => Vec::new(),
    };
    let counts = tools.background_counts(&regions);
    let sigs = tools.significances(&regions);
    info!("Scored {} regions", regions.len());

    let report = Report {
        point,
        regions: regions
            .into_iter()
            .zip(counts.into_iter().zip(sigs))
            .map(|(region, (background_counts, significance))| RegionReport {
                region,
                background_counts,
                significance,
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
