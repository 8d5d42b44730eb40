//! Diffuse gamma-ray background maps for Fermi-LAT cluster searches
//!
//! This crate folds the Fermi galactic diffuse model, the isotropic
//! background spectrum and an exposure cube into an all-sky map of expected
//! photons per square degree for a chosen energy window and live time. The
//! map answers point, subsampled and elliptical-region queries, and scores
//! photon clusters with the Li & Ma (1983) significance.

pub mod algo;
pub mod builder;
pub mod config;
pub mod energy;
pub mod error;
pub mod instrument;
pub mod io;
pub mod significance;
pub mod sky_map;
pub mod tools;

// Re-exports for easier access
pub use builder::{load_products, BackgroundMapBuilder, BackgroundRequest, ModelProducts};
pub use config::{BackgroundConfig, ModelKind, ModelPaths};
pub use energy::{EnergyGrid, EnergyWindow, MAX_ENERGY_MEV, MIN_ENERGY_MEV};
pub use error::{BackgroundError, ConfigurationError, DataFormatError, RangeError};
pub use instrument::{ConversionType, EffectiveAreaCurve, EffectiveAreaError};
pub use io::{write_sky_map, IsotropicSpectrum};
pub use significance::{li_ma_significance, Region};
pub use sky_map::SkyMap;
pub use tools::BackgroundTools;
