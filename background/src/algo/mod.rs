//! Numerical building blocks for background map construction
//!
//! Interpolation over tabulated curves, log-spaced grids and the small
//! averaging helpers used by the sky queries.

pub mod misc;

pub use misc::{interp_clamped, logspace, mean, InterpError};
