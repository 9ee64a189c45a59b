//! # lacuna
//!
//! Gap-filling for monthly satellite raster time series.
//!
//! Monthly single-band rasters are stacked into `(time, row, col)` volumes,
//! with NaN wherever a month has no file, and a missing time slice can be
//! reconstructed by fitting a cubic spline through each pixel's time series.
//!
//! ## Architecture
//!
//! - **Catalog**: expected monthly file names reconciled with files on disk
//! - **Stacking**: TIFF reading/writing and volume assembly
//! - **Interpolation**: per-pixel cubic splines over the time axis
//! - **Combining**: min-max normalisation and weighted blending of two rasters

pub mod catalog;
pub mod combine;
pub mod config;
pub mod error;
pub mod interpolation;
pub mod logging;
pub mod stack;

pub use catalog::{Catalog, CatalogEntry, MonthKey};
pub use config::Config;
pub use error::{LacunaError, Result};
pub use interpolation::{
    interpolate_missing_slice, BoundaryCondition, InterpolationOptions, SliceInterpolator,
};
pub use logging::{
    generate_run_id, init_tracing, log_error, log_operation_end, log_operation_start,
    log_stack_stats, log_timed_operation,
};
