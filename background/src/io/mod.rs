//! I/O for background model products and built sky maps

pub mod fits;
pub mod isotropic;

pub use fits::{read_cube, write_cube, write_sky_map, FitsError};
pub use isotropic::{parse_isotropic_table, read_isotropic, IsotropicError, IsotropicSpectrum};
