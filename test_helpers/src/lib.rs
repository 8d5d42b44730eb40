//! Test helpers for the background workspace
//!
//! Synthetic model products (cubes and isotropic tables) small enough to
//! build in unit tests, plus the shared output directory for artifacts that
//! tests and benchmarks write to disk.

use ndarray::Array3;
use once_cell::sync::Lazy;
use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Energy planes in the Fermi diffuse model grid
pub const MODEL_PLANES: usize = 30;

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Returns the path to the workspace root.
///
/// Walks up from the current directory until it finds a Cargo.toml that
/// declares a `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {e}"))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {e}"))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// Directory for test artifacts such as written sky maps, created on demand
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Path of a file inside [`get_output_dir`]
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// `[energy, lat, lon]` cube holding one value everywhere
pub fn uniform_cube(planes: usize, rows: usize, cols: usize, value: f64) -> Array3<f64> {
    Array3::from_elem((planes, rows, cols), value)
}

/// `[energy, lat, lon]` cube filled from `f(plane, row, col)`
pub fn synthetic_cube<F>(planes: usize, rows: usize, cols: usize, f: F) -> Array3<f64>
where
    F: Fn(usize, usize, usize) -> f64,
{
    Array3::from_shape_fn((planes, rows, cols), |(k, r, c)| f(k, r, c))
}

/// Diffuse-like cube: a falling spectrum, brightest along the galactic plane
///
/// Every pixel is positive. The plane sits in the middle row(s) and the
/// brightness also peaks towards the galactic center at column 0.
pub fn galactic_plane_cube(rows: usize, cols: usize) -> Array3<f64> {
    let mid = (rows as f64 - 1.0) / 2.0;
    synthetic_cube(MODEL_PLANES, rows, cols, |k, r, c| {
        let spectrum = 1e-4 * (1.0 + k as f64).powf(-2.4);
        let lat = (r as f64 - mid) / rows as f64;
        let lon = c as f64 / cols as f64;
        let center = 1.0 + (2.0 * std::f64::consts::PI * lon).cos();
        spectrum * (1.0 + 20.0 * (-lat * lat * 200.0).exp() * (1.0 + center))
    })
}

/// Exposure-like cube: smooth in latitude, rising slowly with energy
pub fn exposure_cube(rows: usize, cols: usize) -> Array3<f64> {
    synthetic_cube(MODEL_PLANES, rows, cols, |k, r, _| {
        let lat = r as f64 / rows.max(1) as f64;
        3.0e10 * (1.0 + 0.01 * k as f64) * (1.0 + 0.2 * lat)
    })
}

/// Isotropic table text from `(energy MeV, intensity)` rows
///
/// A third uncertainty column is added so the table has the layout of the
/// published `iso_*.txt` files.
pub fn isotropic_table(rows: &[(f64, f64)]) -> String {
    let mut text = String::from("# Energy[MeV] dN/dE dN/dE_err\n");
    for &(energy, intensity) in rows {
        let _ = writeln!(text, "{energy:.6e} {intensity:.6e} {:.6e}", intensity * 0.1);
    }
    text
}

/// Isotropic table with the same intensity over the whole model range
pub fn flat_isotropic_table(intensity: f64) -> String {
    isotropic_table(&[(50.0, intensity), (1000.0, intensity), (6.0e5, intensity)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_exists() {
        let root = find_project_root().expect("Failed to find project root");
        assert!(root.exists());
        assert!(root.join("Cargo.toml").exists());
    }

    #[test]
    fn test_output_path() {
        let path = output_path("map.fits");
        assert_eq!(path, get_output_dir().join("map.fits"));
        assert!(get_output_dir().is_dir());
    }

    #[test]
    fn test_synthetic_cube_indexing() {
        let cube = synthetic_cube(2, 3, 4, |k, r, c| (k * 100 + r * 10 + c) as f64);
        assert_eq!(cube.dim(), (2, 3, 4));
        assert_eq!(cube[[1, 2, 3]], 123.0);
    }

    #[test]
    fn test_galactic_plane_is_brightest() {
        let cube = galactic_plane_cube(9, 16);
        assert_eq!(cube.dim(), (MODEL_PLANES, 9, 16));
        assert!(cube.iter().all(|&v| v > 0.0));
        assert!(cube[[0, 4, 0]] > cube[[0, 0, 0]]);
        assert!(cube[[0, 4, 0]] > cube[[5, 4, 0]]);
    }

    #[test]
    fn test_isotropic_table_layout() {
        let text = flat_isotropic_table(2.5e-7);
        let data_rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data_rows.len(), 3);
        assert!(data_rows
            .iter()
            .all(|row| row.split_whitespace().count() == 3));
        assert!(data_rows[0].starts_with("5.000000e1"));
    }
}
