//! Error taxonomy for background map construction
//!
//! Every error surfaces while a [`crate::tools::BackgroundTools`] (or a
//! [`crate::builder::BackgroundMapBuilder`]) is being constructed. Sky queries
//! and significance evaluation never fail: out-of-range coordinates are
//! normalized and degenerate counts map to zero significance.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ModelKind;
use crate::io::fits::FitsError;
use crate::io::isotropic::IsotropicError;

/// Requested energy window or live time outside what the model supports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("Minimum energy {0} MeV is below the supported 50 MeV")]
    MinEnergyTooLow(f64),

    #[error("Maximum energy {0} MeV is above the supported 600 GeV (6e5 MeV)")]
    MaxEnergyTooHigh(f64),

    #[error("Energy window [{min}, {max}] MeV is empty")]
    EmptyWindow { min: f64, max: f64 },

    #[error("Live time must be positive and finite, got {0} s")]
    InvalidLiveTime(f64),
}

/// A model product could not be located
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error(
        "No {model} model path given and FERMI_DIR is not set. Point FERMI_DIR at the \
         Fermi science tools installation or pass an explicit {model} model path"
    )]
    MissingInstallDir { model: ModelKind },

    #[error(
        "FERMI_DIR is set, but the {model} model was not found at {path}. Download it to \
         this location or pass an explicit {model} model path"
    )]
    DefaultNotFound { model: ModelKind, path: PathBuf },
}

/// A model product exists but cannot be used
#[derive(Error, Debug)]
pub enum DataFormatError {
    #[error("Invalid {model} model: {source}")]
    Fits {
        model: ModelKind,
        #[source]
        source: FitsError,
    },

    #[error("Invalid isotropic model: {0}")]
    Isotropic(#[from] IsotropicError),

    #[error("{model} cube has {planes} energy planes, the energy window needs {required}")]
    TooFewPlanes {
        model: ModelKind,
        planes: usize,
        required: usize,
    },

    #[error("{model} cube has an empty {axis} axis")]
    EmptyAxis { model: ModelKind, axis: &'static str },
}

/// Top-level error returned when building a background map
#[derive(Error, Debug)]
pub enum BackgroundError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    DataFormat(#[from] DataFormatError),
}

impl From<IsotropicError> for BackgroundError {
    fn from(err: IsotropicError) -> Self {
        BackgroundError::DataFormat(DataFormatError::Isotropic(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_fermi_dir() {
        let err = ConfigurationError::MissingInstallDir {
            model: ModelKind::Diffuse,
        };
        let message = err.to_string();
        assert!(message.contains("FERMI_DIR"));
        assert!(message.contains("diffuse"));
    }

    #[test]
    fn test_range_error_display() {
        let err = BackgroundError::from(RangeError::MinEnergyTooLow(10.0));
        assert!(err.to_string().contains("10 MeV"));
        assert!(matches!(err, BackgroundError::Range(_)));
    }

    #[test]
    fn test_too_few_planes_display() {
        let err = DataFormatError::TooFewPlanes {
            model: ModelKind::Exposure,
            planes: 3,
            required: 30,
        };
        assert_eq!(
            err.to_string(),
            "exposure cube has 3 energy planes, the energy window needs 30"
        );
    }
}
