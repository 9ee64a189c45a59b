//! Interpolation along the time axis of raster stacks.
//!
//! This module provides the cubic spline used to model each pixel's time
//! series and the slice interpolator that fills a missing time step of a
//! whole `(time, x, y)` volume with it.

pub mod common;
pub mod report;
pub mod slice;
pub mod spline;

pub use report::{CollectingReporter, SkipReason, SkipReporter, SkippedLocation, TracingReporter};
pub use slice::{interpolate_missing_slice, InterpolationOptions, SliceInterpolator};
pub use spline::{BoundaryCondition, CubicSpline};

use crate::error::Result;

/// Get a boundary condition by name
pub fn get_boundary_condition(name: &str) -> Result<BoundaryCondition> {
    name.parse()
}
