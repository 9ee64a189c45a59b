//! Diagnostics for locations the interpolator could not fill.

use parking_lot::Mutex;
use std::fmt;
use tracing::warn;

/// Why a location was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer than two usable samples remained after dropping the missing slice
    InsufficientData { usable: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData { usable } => {
                write!(f, "insufficient data ({} usable samples)", usable)
            }
        }
    }
}

/// A spatial location whose missing value was kept as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedLocation {
    pub x: usize,
    pub y: usize,
    pub reason: SkipReason,
}

/// Receives one record per skipped location
pub trait SkipReporter: Send + Sync {
    fn report(&self, location: &SkippedLocation);
}

/// Emits each skipped location as a `tracing` warning
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SkipReporter for TracingReporter {
    fn report(&self, location: &SkippedLocation) {
        warn!(
            x = location.x,
            y = location.y,
            reason = %location.reason,
            "Not enough valid data to interpolate, skipping location"
        );
    }
}

/// Keeps skipped locations in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    skipped: Mutex<Vec<SkippedLocation>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the locations reported so far
    pub fn skipped(&self) -> Vec<SkippedLocation> {
        self.skipped.lock().clone()
    }

    /// Drain the collected locations
    pub fn take(&self) -> Vec<SkippedLocation> {
        std::mem::take(&mut *self.skipped.lock())
    }

    pub fn len(&self) -> usize {
        self.skipped.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.lock().is_empty()
    }
}

impl SkipReporter for CollectingReporter {
    fn report(&self, location: &SkippedLocation) {
        self.skipped.lock().push(*location);
    }
}
