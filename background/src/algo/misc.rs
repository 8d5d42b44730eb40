//! Miscellaneous numerical helpers used while building background maps.
//!
//! - **Clamped linear interpolation**: 1D interpolation that holds the edge
//!   values outside the tabulated range
//! - **Log-spaced grids**: evenly spaced points in log10 space
//! - **Means**: NaN-free averaging over possibly empty collections

use thiserror::Error;

/// Errors that can occur while validating interpolation tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    #[error("Input vectors must have at least 2 points")]
    InsufficientData,
    #[error("Input vectors must have the same length")]
    MismatchedLengths,
    #[error("X values must be sorted in ascending order")]
    UnsortedData,
    #[error("Table values must be finite")]
    NonFinite,
}

/// Check that `xs`/`ys` describe a usable piecewise-linear table.
pub fn validate_nodes(xs: &[f64], ys: &[f64]) -> Result<(), InterpError> {
    if xs.len() != ys.len() {
        return Err(InterpError::MismatchedLengths);
    }

    if xs.len() < 2 {
        return Err(InterpError::InsufficientData);
    }

    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(InterpError::NonFinite);
    }

    if xs.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(InterpError::UnsortedData);
    }

    Ok(())
}

/// Linear interpolation with edge clamping.
///
/// Values of `x` below `xs[0]` return `ys[0]`, values above the last node
/// return the last `ys`. Inside the table the interval is found by binary
/// search and the usual y = y₁ + t(y₂ - y₁) formula is applied.
///
/// # Arguments
///
/// * `x` - The x-coordinate at which to interpolate
/// * `xs` - Node positions, strictly ascending
/// * `ys` - Node values, same length as `xs`
///
/// # Example
///
/// ```
/// use background::algo::misc::interp_clamped;
///
/// let xs = [1.0, 2.0, 4.0];
/// let ys = [10.0, 20.0, 40.0];
/// assert_eq!(interp_clamped(3.0, &xs, &ys).unwrap(), 30.0);
/// assert_eq!(interp_clamped(0.0, &xs, &ys).unwrap(), 10.0);
/// assert_eq!(interp_clamped(9.0, &xs, &ys).unwrap(), 40.0);
/// ```
pub fn interp_clamped(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
    validate_nodes(xs, ys)?;
    Ok(interp_clamped_unchecked(x, xs, ys))
}

/// Same as [`interp_clamped`] for tables already checked by [`validate_nodes`].
pub(crate) fn interp_clamped_unchecked(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }

    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }

    // First node strictly greater than x, always in 1..=last here
    let upper = xs.partition_point(|&probe| probe <= x);
    let lower = upper - 1;

    let t = (x - xs[lower]) / (xs[upper] - xs[lower]);
    ys[lower] + t * (ys[upper] - ys[lower])
}

/// `n` points evenly spaced in log10 between `10^start_exp` and `10^stop_exp`.
///
/// The exponents follow `linspace` semantics: the final exponent is exactly
/// `stop_exp` rather than an accumulated sum of steps.
pub fn logspace(start_exp: f64, stop_exp: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![10f64.powf(start_exp)],
        _ => {
            let step = (stop_exp - start_exp) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let exponent = if i == n - 1 {
                        stop_exp
                    } else {
                        start_exp + i as f64 * step
                    };
                    10f64.powf(exponent)
                })
                .collect()
        }
    }
}

/// Arithmetic mean of the values, or `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    (count > 0).then(|| sum / count as f64)
}
