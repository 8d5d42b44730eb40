//! Isotropic background spectrum tables
//!
//! The isotropic model ships as a plain text table: one row per energy, with
//! at least three numeric columns (energy in MeV, intensity, uncertainty).
//! Fields may be separated by whitespace or commas, surrounding blanks are
//! stripped, and `#` starts a comment. Only the first two columns are used,
//! but every data row must carry the same number of columns.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::algo::misc::{interp_clamped_unchecked, validate_nodes, InterpError};

/// Minimum number of columns in an isotropic table
pub const MIN_COLUMNS: usize = 3;

/// Errors that can occur while reading an isotropic spectrum
#[derive(Error, Debug, PartialEq)]
pub enum IsotropicError {
    #[error("Cannot read isotropic table {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Line {line}: cannot parse '{field}' as a number")]
    NotNumeric { line: usize, field: String },

    #[error("Line {line}: expected at least 3 columns, found {found}")]
    TooFewColumns { line: usize, found: usize },

    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Isotropic table is not usable for interpolation: {0}")]
    InvalidSpectrum(#[from] InterpError),
}

/// Isotropic intensity tabulated against energy
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicSpectrum {
    /// Energies in MeV, strictly ascending
    energies: Vec<f64>,
    /// Intensity at each energy
    intensities: Vec<f64>,
}

impl IsotropicSpectrum {
    /// Build a spectrum from energy/intensity nodes
    pub fn new(energies: Vec<f64>, intensities: Vec<f64>) -> Result<Self, IsotropicError> {
        validate_nodes(&energies, &intensities)?;
        Ok(Self {
            energies,
            intensities,
        })
    }

    /// Intensity at `energy_mev`, holding the edge values outside the table
    pub fn at(&self, energy_mev: f64) -> f64 {
        interp_clamped_unchecked(energy_mev, &self.energies, &self.intensities)
    }

    /// Node energies in MeV
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Node intensities
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }
}

/// Parse the text of an isotropic table
pub fn parse_isotropic_table(text: &str) -> Result<IsotropicSpectrum, IsotropicError> {
    let mut energies = Vec::new();
    let mut intensities = Vec::new();
    let mut n_columns: Option<usize> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = raw_line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let fields: Vec<&str> = content
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect();

        match n_columns {
            None if fields.len() < MIN_COLUMNS => {
                return Err(IsotropicError::TooFewColumns {
                    line: line_no,
                    found: fields.len(),
                });
            }
            None => n_columns = Some(fields.len()),
            Some(expected) if expected != fields.len() => {
                return Err(IsotropicError::ColumnMismatch {
                    line: line_no,
                    expected,
                    found: fields.len(),
                });
            }
            Some(_) => {}
        }

        let values = fields
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|_| IsotropicError::NotNumeric {
                    line: line_no,
                    field: field.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        energies.push(values[0]);
        intensities.push(values[1]);
    }

    IsotropicSpectrum::new(energies, intensities)
}

/// Read and parse an isotropic table from disk
pub fn read_isotropic<P: AsRef<Path>>(path: P) -> Result<IsotropicSpectrum, IsotropicError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| IsotropicError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_isotropic_table(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_whitespace_table() {
        let text = "\
# energy  intensity  error
  58.47   8.2e-07    1.0e-08
  99.0    3.1e-07    9.0e-09

  301.5   4.0e-08    2.0e-09
";
        let spectrum = parse_isotropic_table(text).unwrap();
        assert_eq!(spectrum.energies(), &[58.47, 99.0, 301.5]);
        assert_eq!(spectrum.intensities(), &[8.2e-07, 3.1e-07, 4.0e-08]);
    }

    #[test]
    fn test_parse_comma_table_with_extra_columns() {
        let text = "100, 2.0, 0.1, 7\n200 ,4.0,0.1,7\n400,8.0 , 0.1 ,7 # trailing comment\n";
        let spectrum = parse_isotropic_table(text).unwrap();
        assert_eq!(spectrum.energies(), &[100.0, 200.0, 400.0]);
        assert_relative_eq!(spectrum.at(300.0), 6.0);
    }

    #[test]
    fn test_interpolation_is_clamped() {
        let spectrum = IsotropicSpectrum::new(vec![100.0, 200.0], vec![1.0, 3.0]).unwrap();
        assert_eq!(spectrum.at(10.0), 1.0);
        assert_eq!(spectrum.at(1e6), 3.0);
        assert_relative_eq!(spectrum.at(150.0), 2.0);
    }

    #[test]
    fn test_two_columns_rejected() {
        let err = parse_isotropic_table("100 1.0\n200 2.0\n").unwrap_err();
        assert_eq!(err, IsotropicError::TooFewColumns { line: 1, found: 2 });
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = parse_isotropic_table("100 1.0 0.1\n200 2.0 0.1 5\n").unwrap_err();
        assert_eq!(
            err,
            IsotropicError::ColumnMismatch {
                line: 2,
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = parse_isotropic_table("100 1.0 0.1\n200 abc 0.1\n").unwrap_err();
        assert!(matches!(err, IsotropicError::NotNumeric { line: 2, .. }));
    }

    #[test]
    fn test_unsorted_or_short_tables_rejected() {
        assert_eq!(
            parse_isotropic_table("200 1.0 0.1\n100 2.0 0.1\n").unwrap_err(),
            IsotropicError::InvalidSpectrum(InterpError::UnsortedData)
        );
        assert_eq!(
            parse_isotropic_table("# only a comment\n").unwrap_err(),
            IsotropicError::InvalidSpectrum(InterpError::InsufficientData)
        );
    }

    #[test]
    fn test_non_finite_values_rejected() {
        // "nan" and "inf" parse as f64 and must not reach interpolation
        assert_eq!(
            parse_isotropic_table("nan 1.0 0.1\n100 2.0 0.1\n200 3.0 0.1\n").unwrap_err(),
            IsotropicError::InvalidSpectrum(InterpError::NonFinite)
        );
        assert_eq!(
            parse_isotropic_table("100 1.0 0.1\n200 inf 0.1\n").unwrap_err(),
            IsotropicError::InvalidSpectrum(InterpError::NonFinite)
        );
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "50 1.0 0.0").unwrap();
        writeln!(file, "5000 0.5 0.0").unwrap();

        let spectrum = read_isotropic(file.path()).unwrap();
        assert_eq!(spectrum.energies(), &[50.0, 5000.0]);

        let err = read_isotropic("/no/such/iso.txt").unwrap_err();
        assert!(matches!(err, IsotropicError::Io { .. }));
    }
}
