//! All-sky photon density map and the queries it answers.
//!
//! A [`SkyMap`] is an equirectangular grid in galactic coordinates, indexed
//! `[latitude row, longitude column]`. Row 0 starts at latitude -90° and the
//! rows cover [-90°, +90°] linearly. Column 0 starts at the map's longitude
//! origin and the columns cover one full turn.
//!
//! Three query shapes are supported:
//!
//! - [`SkyMap::point_rate`]: the pixel containing a coordinate
//! - [`SkyMap::subsample_rate`]: the mean of five jittered point lookups
//! - [`SkyMap::integrated_rate`]: expected photons inside an ellipse, using
//!   the mean over its circumscribing square
//!
//! None of the queries fail. Longitudes wrap, and windows that run over a
//! pole are reflected onto the opposite meridian.

use ndarray::{s, Array1, Array2, ArrayView1, Zip};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::algo::mean;

/// Photon density per square degree on an equirectangular grid
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMap {
    data: Array2<f64>,
    longitude_origin_deg: f64,
}

impl SkyMap {
    /// Wrap a `[lat, lon]` density array with the longitude origin at 0°
    ///
    /// # Panics
    ///
    /// Panics if either axis is empty.
    pub fn new(data: Array2<f64>) -> Self {
        let (rows, cols) = data.dim();
        assert!(
            rows > 0 && cols > 0,
            "Sky map needs at least one pixel, got {rows}x{cols}"
        );
        Self {
            data,
            longitude_origin_deg: 0.0,
        }
    }

    /// Set the longitude of the left edge of column 0
    pub fn with_longitude_origin(mut self, origin_deg: f64) -> Self {
        self.longitude_origin_deg = origin_deg;
        self
    }

    /// `(rows, cols)` of the underlying grid
    pub fn dims(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn longitude_origin(&self) -> f64 {
        self.longitude_origin_deg
    }

    fn lon_step(&self) -> f64 {
        360.0 / self.data.ncols() as f64
    }

    fn lat_step(&self) -> f64 {
        180.0 / self.data.nrows() as f64
    }

    /// Column index of a longitude, wrapped into the map
    fn column(&self, lon_deg: f64) -> usize {
        let wrapped = (lon_deg - self.longitude_origin_deg).rem_euclid(360.0);
        // rem_euclid may round up to exactly 360
        ((wrapped / self.lon_step()) as usize).min(self.data.ncols() - 1)
    }

    /// Row index of a latitude, before clamping
    fn raw_row(&self, lat_deg: f64) -> i64 {
        ((lat_deg + 90.0) / self.lat_step()) as i64
    }

    /// Pixel `(row, col)` containing a coordinate.
    ///
    /// Latitude +90° falls exactly on the upper boundary and is mapped to the
    /// last row; latitudes beyond the poles are clamped into the map.
    pub fn pixel_index(&self, lon_deg: f64, lat_deg: f64) -> (usize, usize) {
        let last_row = self.data.nrows() as i64 - 1;
        let row = self.raw_row(lat_deg).clamp(0, last_row) as usize;
        (row, self.column(lon_deg))
    }

    /// Photon density at a single coordinate
    pub fn point_rate(&self, lon_deg: f64, lat_deg: f64) -> f64 {
        self.data[self.pixel_index(lon_deg, lat_deg)]
    }

    /// Elementwise [`Self::point_rate`]
    ///
    /// # Panics
    ///
    /// Panics if the inputs differ in length.
    pub fn point_rates(&self, lon_deg: ArrayView1<f64>, lat_deg: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(lon_deg)
            .and(lat_deg)
            .map_collect(|&lon, &lat| self.point_rate(lon, lat))
    }

    /// Mean density of five lookups around a coordinate.
    ///
    /// With `s = eps / 2` the samples are `(l, b)`, `(l+s, b-s)`, `(l-s, b)`,
    /// `(l+s, b)` and `(l, b-s)`. Each sample that lands beyond a pole is
    /// reflected onto the opposite meridian first.
    pub fn subsample_rate(&self, lon_deg: f64, lat_deg: f64, eps_deg: f64) -> f64 {
        let shift = eps_deg / 2.0;
        let samples = [
            (lon_deg, lat_deg),
            (lon_deg + shift, lat_deg - shift),
            (lon_deg - shift, lat_deg),
            (lon_deg + shift, lat_deg),
            (lon_deg, lat_deg - shift),
        ];
        let total: f64 = samples
            .iter()
            .map(|&(lon, lat)| {
                let (lon, lat) = reflect_over_pole(lon, lat);
                self.point_rate(lon, lat)
            })
            .sum();
        total / samples.len() as f64
    }

    /// Elementwise [`Self::subsample_rate`] with one `eps` for every point
    ///
    /// # Panics
    ///
    /// Panics if the inputs differ in length.
    pub fn subsample_rates(
        &self,
        lon_deg: ArrayView1<f64>,
        lat_deg: ArrayView1<f64>,
        eps_deg: f64,
    ) -> Array1<f64> {
        Zip::from(lon_deg)
            .and(lat_deg)
            .map_collect(|&lon, &lat| self.subsample_rate(lon, lat, eps_deg))
    }

    /// Expected photon count inside an ellipse.
    ///
    /// The density is averaged over the square inscribed in a circle of
    /// radius `semi_major_deg`, widened in longitude by `1/cos(lat)`, then
    /// multiplied by the ellipse area `π·A·B`. The ellipse orientation is
    /// not used.
    ///
    /// Both axes of the window are sized with the longitude pixel scale
    /// (`columns / 360` pixels per degree), also on maps whose latitude
    /// pixels are not square.
    pub fn integrated_rate(
        &self,
        lon_deg: f64,
        lat_deg: f64,
        semi_major_deg: f64,
        semi_minor_deg: f64,
    ) -> f64 {
        let (height, width) = self.dims();
        let (height, width) = (height as i64, width as i64);
        let (row, col) = self.pixel_index(lon_deg, lat_deg);

        let half = semi_major_deg.abs() * FRAC_1_SQRT_2;
        let lon_scale = (1.0 / lat_deg.to_radians().cos()).abs();
        let pixels_per_deg = 1.0 / self.lon_step();
        let lon_reach = half * lon_scale * pixels_per_deg;
        let lat_reach = half * pixels_per_deg;

        // Bounds truncate toward zero
        let col_start = (col as f64 - lon_reach).trunc();
        let col_stop = (col as f64 + lon_reach + 1.0).trunc();
        let (col_start, col_stop) = if col_stop - col_start > width as f64 {
            (0, width)
        } else {
            (col_start as i64, col_stop as i64)
        };
        let row_start = (row as f64 - lat_reach) as i64;
        let row_stop = (row as f64 + lat_reach + 1.0) as i64;

        let inside = col_start >= 0 && col_stop <= width && row_start >= 0 && row_stop <= height;
        let mean = if inside {
            let window = self.data.slice(s![
                row_start as usize..row_stop as usize,
                col_start as usize..col_stop as usize
            ]);
            window.mean()
        } else {
            self.wrapped_window_mean(row_start..row_stop, col_start..col_stop)
        };

        mean.unwrap_or(f64::NAN) * PI * semi_major_deg * semi_minor_deg
    }

    /// Elementwise [`Self::integrated_rate`]
    ///
    /// # Panics
    ///
    /// Panics if the inputs differ in length.
    pub fn integrated_rates(
        &self,
        lon_deg: ArrayView1<f64>,
        lat_deg: ArrayView1<f64>,
        semi_major_deg: ArrayView1<f64>,
        semi_minor_deg: ArrayView1<f64>,
    ) -> Array1<f64> {
        Zip::from(lon_deg)
            .and(lat_deg)
            .and(semi_major_deg)
            .and(semi_minor_deg)
            .map_collect(|&lon, &lat, &a, &b| self.integrated_rate(lon, lat, a, b))
    }

    /// Mean over a window that crosses the longitude seam or a pole
    fn wrapped_window_mean(
        &self,
        rows: std::ops::Range<i64>,
        cols: std::ops::Range<i64>,
    ) -> Option<f64> {
        let (height, width) = self.dims();
        let (height, width) = (height as i64, width as i64);

        let columns: Vec<usize> = cols.map(|c| c.rem_euclid(width) as usize).collect();
        let opposite: Vec<usize> = columns
            .iter()
            .map(|&c| (c + width as usize / 2) % width as usize)
            .collect();

        let mut normal = Vec::new();
        let mut high = Vec::new();
        let mut low = Vec::new();
        for raw in rows {
            let (kind, row) = SubWindow::classify(raw, height);
            match kind {
                SubWindow::Normal => normal.push(row),
                SubWindow::ReflectedHigh => high.push(row),
                SubWindow::ReflectedLow => low.push(row),
            }
        }

        let parts = [
            (SubWindow::Normal, normal),
            (SubWindow::ReflectedHigh, high),
            (SubWindow::ReflectedLow, low),
        ]
        .map(|(kind, rows)| {
            let cols = if kind.is_reflected() {
                &opposite
            } else {
                &columns
            };
            SubWindowMean {
                mean: self.gather_mean(&rows, cols),
                rows: rows.len(),
            }
        });

        weighted_mean(&parts)
    }

    fn gather_mean(&self, rows: &[usize], cols: &[usize]) -> f64 {
        mean(
            rows.iter()
                .flat_map(|&r| cols.iter().map(move |&c| self.data[[r, c]])),
        )
        .unwrap_or(0.0)
    }
}

/// Reflect a coordinate beyond a pole onto the opposite meridian
fn reflect_over_pole(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let (lon, lat) = if lat_deg > 90.0 {
        (lon_deg + 180.0, (-lat_deg).rem_euclid(90.0))
    } else if lat_deg < -90.0 {
        (lon_deg + 180.0, 90.0 - lat_deg.rem_euclid(90.0))
    } else {
        (lon_deg, lat_deg)
    };
    (lon.rem_euclid(360.0), lat)
}

/// Which part of a pole-crossing window a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubWindow {
    /// Row inside the map
    Normal,
    /// Row past the last row, reflected back from the top
    ReflectedHigh,
    /// Row before the first row, reflected back from the bottom
    ReflectedLow,
}

impl SubWindow {
    /// Classify a raw row index and map it into the grid
    fn classify(row: i64, height: i64) -> (Self, usize) {
        if row >= height {
            (SubWindow::ReflectedHigh, (-row).rem_euclid(height) as usize)
        } else if row < 0 {
            (SubWindow::ReflectedLow, (-row).min(height - 1) as usize)
        } else {
            (SubWindow::Normal, row as usize)
        }
    }

    fn is_reflected(self) -> bool {
        !matches!(self, SubWindow::Normal)
    }
}

#[derive(Debug, Clone, Copy)]
struct SubWindowMean {
    mean: f64,
    rows: usize,
}

/// Row-count weighted average of sub-window means, skipping empty ones
fn weighted_mean(parts: &[SubWindowMean]) -> Option<f64> {
    let (sum, rows) = parts
        .iter()
        .filter(|part| part.rows > 0)
        .fold((0.0, 0usize), |(sum, rows), part| {
            (sum + part.mean * part.rows as f64, rows + part.rows)
        });
    (rows > 0).then(|| sum / rows as f64)
}
