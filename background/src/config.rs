//! Locating the background model products.
//!
//! A [`BackgroundConfig`] carries everything needed to find the three model
//! files and to pick the instrument response. Paths left unset fall back to
//! the conventional layout of a Fermi science tools installation:
//!
//! ```text
//! <fermi_dir>/refdata/fermi/galdiffuse/gll_iem_v05.fits   diffuse model
//! <fermi_dir>/refdata/fermi/galdiffuse/iso_source_v05.txt isotropic model
//! <fermi_dir>/refdata/fermi/galdiffuse/expcube2.fits      exposure cube
//! ```
//!
//! The installation directory is an explicit field. [`BackgroundConfig::from_env`]
//! is the only place the `FERMI_DIR` environment variable is consulted.

use log::warn;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;
use crate::instrument::ConversionType;

/// Environment variable naming the Fermi science tools installation
pub const FERMI_DIR_ENV: &str = "FERMI_DIR";

/// Directory of the diffuse model products, relative to the installation
pub const GALDIFFUSE_SUBDIR: &str = "refdata/fermi/galdiffuse";

/// Default file name of the galactic diffuse model
pub const DEFAULT_DIFFUSE_MODEL: &str = "gll_iem_v05.fits";

/// Default file name of the isotropic model
pub const DEFAULT_ISOTROPIC_MODEL: &str = "iso_source_v05.txt";

/// Default file name of the exposure cube
pub const DEFAULT_EXPOSURE_CUBE: &str = "expcube2.fits";

/// The three model products the map builder consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Diffuse,
    Isotropic,
    Exposure,
}

impl ModelKind {
    fn default_file_name(self) -> &'static str {
        match self {
            ModelKind::Diffuse => DEFAULT_DIFFUSE_MODEL,
            ModelKind::Isotropic => DEFAULT_ISOTROPIC_MODEL,
            ModelKind::Exposure => DEFAULT_EXPOSURE_CUBE,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Diffuse => write!(f, "diffuse"),
            ModelKind::Isotropic => write!(f, "isotropic"),
            ModelKind::Exposure => write!(f, "exposure"),
        }
    }
}

/// Where to find the model products and which instrument response to use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundConfig {
    /// Fermi science tools installation directory
    pub fermi_dir: Option<PathBuf>,
    /// Galactic diffuse intensity cube (FITS)
    pub diffuse_model: Option<PathBuf>,
    /// Isotropic spectrum table (text)
    pub isotropic_model: Option<PathBuf>,
    /// Exposure cube (FITS)
    pub exposure_cube: Option<PathBuf>,
    /// Tracker conversion type selecting the effective-area curve
    pub conversion: ConversionType,
    /// Longitude (degrees) of the left edge of the first map column
    pub longitude_origin_deg: f64,
}

impl BackgroundConfig {
    /// Configuration with the installation directory taken from `FERMI_DIR`
    pub fn from_env() -> Self {
        Self {
            fermi_dir: std::env::var_os(FERMI_DIR_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    pub fn with_fermi_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fermi_dir = Some(dir.into());
        self
    }

    pub fn with_diffuse_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.diffuse_model = Some(path.into());
        self
    }

    pub fn with_isotropic_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.isotropic_model = Some(path.into());
        self
    }

    pub fn with_exposure_cube(mut self, path: impl Into<PathBuf>) -> Self {
        self.exposure_cube = Some(path.into());
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionType) -> Self {
        self.conversion = conversion;
        self
    }

    /// Set the longitude of the first map column.
    ///
    /// The Fermi `gll_iem` products start at -180°; the default is 0°.
    pub fn with_longitude_origin(mut self, origin_deg: f64) -> Self {
        if !(-360.0..=360.0).contains(&origin_deg) {
            warn!("Longitude origin {origin_deg}° is outside [-360, 360]; it will be wrapped");
        }
        self.longitude_origin_deg = origin_deg;
        self
    }

    /// Resolve every model path, falling back to the installation layout.
    ///
    /// Explicit paths are returned as given; a missing file there surfaces
    /// later as a data format error. Default paths must exist.
    pub fn resolve(&self) -> Result<ModelPaths, ConfigurationError> {
        Ok(ModelPaths {
            diffuse: self.resolve_one(ModelKind::Diffuse, self.diffuse_model.as_deref())?,
            isotropic: self.resolve_one(ModelKind::Isotropic, self.isotropic_model.as_deref())?,
            exposure: self.resolve_one(ModelKind::Exposure, self.exposure_cube.as_deref())?,
        })
    }

    fn resolve_one(
        &self,
        model: ModelKind,
        explicit: Option<&Path>,
    ) -> Result<PathBuf, ConfigurationError> {
        if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path.to_path_buf());
        }

        let fermi_dir = self
            .fermi_dir
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigurationError::MissingInstallDir { model })?;

        let path = fermi_dir
            .join(GALDIFFUSE_SUBDIR)
            .join(model.default_file_name());
        if path.exists() {
            Ok(path)
        } else {
            Err(ConfigurationError::DefaultNotFound { model, path })
        }
    }
}

/// Fully resolved model product locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub diffuse: PathBuf,
    pub isotropic: PathBuf,
    pub exposure: PathBuf,
}
