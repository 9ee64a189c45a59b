//! Test data generation utilities.
//!
//! This module writes monthly raster series with known per-pixel time
//! profiles so that reconstructed values can be checked exactly.

#![allow(dead_code)]

use ndarray::Array2;
use std::path::Path;

use lacuna::catalog::{expected_months, MonthKey};
use lacuna::stack::write_raster;
use lacuna::Result;

/// File name prefix used by the generated series
pub const PREFIX: &str = "clipped_final_img";

/// Value of pixel `(row, col)` at time index `t`.
///
/// Cubic in `t`, so a not-a-knot spline through any four or more samples
/// reproduces it exactly.
pub fn series_value(t: usize, row: usize, col: usize) -> f64 {
    let t = t as f64;
    0.01 * t * t * t - 0.3 * t * t + 2.0 * t + (row * 10 + col) as f64
}

/// Grid of every pixel at time index `t`
pub fn slice_at(t: usize, shape: (usize, usize)) -> Array2<f64> {
    Array2::from_shape_fn(shape, |(row, col)| series_value(t, row, col))
}

/// Write one raster per month of `start_year..=end_year` into `dir`,
/// leaving out the months in `omit`.
///
/// `mask` pixels are written as NaN in every month.
pub fn create_monthly_series(
    dir: &Path,
    start_year: i32,
    end_year: i32,
    shape: (usize, usize),
    omit: &[MonthKey],
    mask: &[(usize, usize)],
) -> Result<()> {
    for (t, key) in expected_months(start_year, end_year)?.into_iter().enumerate() {
        if omit.contains(&key) {
            continue;
        }
        let mut grid = slice_at(t, shape);
        for &cell in mask {
            grid[cell] = f64::NAN;
        }
        write_raster(&dir.join(key.filename(PREFIX)), &grid)?;
    }
    Ok(())
}
