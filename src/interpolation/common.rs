//! Common utilities for time-axis interpolation.

use ndarray::ArrayView1;

use crate::error::{LacunaError, Result};

/// Whether a sample can take part in a fit
pub fn is_usable(value: f64, nodata: Option<f64>) -> bool {
    value.is_finite() && !nodata.is_some_and(|nd| value == nd)
}

/// Collect the usable `(t, value)` samples of a series, skipping `missing_index`.
///
/// Returned in ascending time order as separate knot and value vectors.
pub fn valid_samples(
    series: ArrayView1<'_, f64>,
    missing_index: usize,
    nodata: Option<f64>,
) -> (Vec<f64>, Vec<f64>) {
    let mut times = Vec::with_capacity(series.len().saturating_sub(1));
    let mut values = Vec::with_capacity(series.len().saturating_sub(1));

    for (t, &value) in series.iter().enumerate() {
        if t != missing_index && is_usable(value, nodata) {
            times.push(t as f64);
            values.push(value);
        }
    }

    (times, values)
}

/// Check that `missing_index` addresses a slice of a time axis of length `time_steps`
pub fn validate_missing_index(missing_index: usize, time_steps: usize) -> Result<()> {
    if time_steps == 0 {
        return Err(LacunaError::invalid_argument(
            "missing_index",
            "Volume has an empty time axis",
        ));
    }
    if missing_index >= time_steps {
        return Err(LacunaError::invalid_argument(
            "missing_index",
            format!(
                "Index {} is outside the time axis [0, {})",
                missing_index, time_steps
            ),
        ));
    }
    Ok(())
}

/// Convert a signed, user-supplied time index into a checked one
pub fn checked_time_index(index: i64, time_steps: usize) -> Result<usize> {
    let index = usize::try_from(index).map_err(|_| {
        LacunaError::invalid_argument(
            "missing_index",
            format!("Index {} is negative", index),
        )
    })?;
    validate_missing_index(index, time_steps)?;
    Ok(index)
}
