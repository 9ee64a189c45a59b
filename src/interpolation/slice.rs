//! Reconstruction of one missing time slice in a raster time series.
//!
//! Every spatial location is handled on its own: the usable samples of its
//! time series (all time steps except the missing one, minus NaN / no-data)
//! are fitted with a [`CubicSpline`] over the time index, and the spline is
//! evaluated at the missing index. Missing indices at either end of the time
//! axis are extrapolated. Locations with fewer than two usable samples keep
//! their original value and are passed to the configured [`SkipReporter`].

use ndarray::{s, Array3, ArrayView1, Axis};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::common::{valid_samples, validate_missing_index};
use super::report::{SkipReason, SkipReporter, SkippedLocation, TracingReporter};
use super::spline::{BoundaryCondition, CubicSpline};
use crate::error::{LacunaError, Result};

/// Tuning for [`SliceInterpolator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationOptions {
    /// Spline end condition
    pub boundary: BoundaryCondition,
    /// Sentinel treated like NaN when selecting samples
    pub nodata: Option<f64>,
    /// Fan locations out over the rayon pool
    pub parallel: bool,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            boundary: BoundaryCondition::default(),
            nodata: None,
            parallel: true,
        }
    }
}

/// Result of fitting one location
#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Filled(f64),
    Skipped(SkipReason),
}

/// Fills a missing time slice with per-pixel cubic splines
#[derive(Clone)]
pub struct SliceInterpolator {
    options: InterpolationOptions,
    reporter: Arc<dyn SkipReporter>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for SliceInterpolator {
    fn default() -> Self {
        Self::new(InterpolationOptions::default())
    }
}

impl SliceInterpolator {
    /// Create an interpolator that reports skipped locations through `tracing`
    pub fn new(options: InterpolationOptions) -> Self {
        Self {
            options,
            reporter: Arc::new(TracingReporter),
            cancel: None,
        }
    }

    /// Replace the skip reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn SkipReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Check `flag` before each location; once set, [`Self::interpolate`]
    /// returns [`LacunaError::Cancelled`]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Options this interpolator was built with
    pub fn options(&self) -> &InterpolationOptions {
        &self.options
    }

    /// Reconstruct slice `missing_index` of a `(time, x, y)` volume.
    ///
    /// Returns a new volume of the same shape; every slice other than
    /// `missing_index` is an exact copy of the input.
    pub fn interpolate(&self, volume: &Array3<f64>, missing_index: usize) -> Result<Array3<f64>> {
        let (time_steps, x_dim, y_dim) = volume.dim();
        validate_missing_index(missing_index, time_steps)?;

        debug!(
            time_steps = time_steps,
            x_dim = x_dim,
            y_dim = y_dim,
            missing_index = missing_index,
            boundary = %self.options.boundary,
            parallel = self.options.parallel,
            "Interpolating missing slice"
        );

        let locations = x_dim * y_dim;
        let fit = |k: usize| -> Result<Outcome> {
            if self.is_cancelled() {
                return Err(LacunaError::Cancelled);
            }
            let (x, y) = (k / y_dim, k % y_dim);
            Ok(reconstruct_location(
                volume.slice(s![.., x, y]),
                missing_index,
                &self.options,
            ))
        };

        let outcomes: Vec<Outcome> = if self.options.parallel {
            (0..locations)
                .into_par_iter()
                .map(&fit)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..locations).map(&fit).collect::<Result<Vec<_>>>()?
        };

        let mut output = volume.to_owned();
        let mut target = output.index_axis_mut(Axis(0), missing_index);
        let mut skipped = 0usize;

        for (k, outcome) in outcomes.into_iter().enumerate() {
            let (x, y) = (k / y_dim, k % y_dim);
            match outcome {
                Outcome::Filled(value) => target[[x, y]] = value,
                Outcome::Skipped(reason) => {
                    skipped += 1;
                    self.reporter.report(&SkippedLocation { x, y, reason });
                }
            }
        }

        info!(
            missing_index = missing_index,
            filled = locations - skipped,
            skipped = skipped,
            "Missing slice interpolated"
        );

        Ok(output)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Fit one location's time series and evaluate it at `missing_index`
fn reconstruct_location(
    series: ArrayView1<'_, f64>,
    missing_index: usize,
    options: &InterpolationOptions,
) -> Outcome {
    let (times, values) = valid_samples(series, missing_index, options.nodata);
    if times.len() < 2 {
        return Outcome::Skipped(SkipReason::InsufficientData {
            usable: times.len(),
        });
    }

    let usable = times.len();
    match CubicSpline::new(times, values, options.boundary) {
        Ok(spline) => Outcome::Filled(spline.evaluate(missing_index as f64)),
        Err(e) => {
            debug!(error = %e, usable = usable, "Spline construction failed");
            Outcome::Skipped(SkipReason::InsufficientData { usable })
        }
    }
}

/// Reconstruct `missing_index` with default options, logging skipped locations
pub fn interpolate_missing_slice(volume: &Array3<f64>, missing_index: usize) -> Result<Array3<f64>> {
    SliceInterpolator::default().interpolate(volume, missing_index)
}
