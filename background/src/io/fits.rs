//! FITS file I/O for background model cubes and sky maps
//!
//! Model cubes are stored as the primary image of a FITS file with three
//! axes: NAXIS1 = longitude pixels, NAXIS2 = latitude pixels, NAXIS3 =
//! energy planes. In memory they are `Array3<f64>` indexed
//! `[energy, latitude, longitude]`, matching the C-order shape reported by
//! cfitsio. Header keywords beyond the axis sizes are not interpreted.

use fitsio::hdu::HduInfo;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::{Array2, Array3};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error: {0}")]
    FitsIo(#[from] fitsio::errors::Error),

    #[error("Cannot open FITS file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("Primary HDU of {0} is not an image")]
    NotAnImage(PathBuf),

    #[error("Expected a 3-D cube in {path}, found {naxis} axes")]
    NotACube { path: PathBuf, naxis: usize },

    #[error("Invalid data in HDU: {0}")]
    InvalidData(String),
}

/// Read the primary image of a FITS file as an `[energy, lat, lon]` cube
///
/// # Arguments
/// * `path` - Path to the FITS file
///
/// # Returns
/// * `Result<Array3<f64>, FitsError>` - The cube, converted to f64
pub fn read_cube<P: AsRef<Path>>(path: P) -> Result<Array3<f64>, FitsError> {
    let path = path.as_ref();
    let mut fptr = FitsFile::open(path).map_err(|source| FitsError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let hdu = fptr.primary_hdu()?;

    // cfitsio reports the shape slowest axis first: [NAXIS3, NAXIS2, NAXIS1]
    let shape = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } => shape.clone(),
        _ => return Err(FitsError::NotAnImage(path.to_path_buf())),
    };
    if shape.len() != 3 {
        return Err(FitsError::NotACube {
            path: path.to_path_buf(),
            naxis: shape.len(),
        });
    }

    let data: Vec<f64> = hdu.read_image(&mut fptr)?;
    Array3::from_shape_vec((shape[0], shape[1], shape[2]), data).map_err(|_| {
        FitsError::InvalidData(format!(
            "Cannot reshape {} into {:?}",
            path.display(),
            shape
        ))
    })
}

/// Write an `[energy, lat, lon]` cube as the primary image of a new FITS file
///
/// Any existing file at `path` is replaced.
pub fn write_cube<P: AsRef<Path>>(cube: &Array3<f64>, path: P) -> Result<(), FitsError> {
    let (planes, rows, cols) = cube.dim();
    write_primary_image(path.as_ref(), &[planes, rows, cols], cube.iter().copied())
}

/// Write a 2-D `[lat, lon]` sky map as the primary image of a new FITS file
///
/// Any existing file at `path` is replaced.
pub fn write_sky_map<P: AsRef<Path>>(map: &Array2<f64>, path: P) -> Result<(), FitsError> {
    let (rows, cols) = map.dim();
    write_primary_image(path.as_ref(), &[rows, cols], map.iter().copied())
}

fn write_primary_image(
    path: &Path,
    dimensions: &[usize],
    values: impl Iterator<Item = f64>,
) -> Result<(), FitsError> {
    // cfitsio refuses to create over an existing file
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| FitsError::InvalidData(format!("Cannot replace {}: {e}", path.display())))?;
    }

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions,
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()?;
    let hdu = fptr.primary_hdu()?;

    // Logical (row-major) iteration order matches the FITS pixel order
    let flat: Vec<f64> = values.collect();
    hdu.write_image(&mut fptr, &flat)?;

    Ok(())
}
