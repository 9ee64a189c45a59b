//! Monthly raster catalog.
//!
//! A monthly series is expected to contain one file per month, named
//! `<prefix>_<YYYY>_<MM>.tif`, for every month of every year in an inclusive
//! year range. The catalog lines those expectations up against the files that
//! are actually on disk, in time order, so that stacking can leave gaps where
//! months are missing.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{LacunaError, Result};

/// Extension of raster files picked up from a directory listing
pub const RASTER_EXTENSION: &str = "tif";

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Create a month key, rejecting months outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            LacunaError::invalid_argument("month", format!("Invalid month: {}-{}", year, month))
        })?;
        Ok(Self {
            year: date.year(),
            month: date.month(),
        })
    }

    /// Expected file name of this month's raster
    pub fn filename(&self, prefix: &str) -> String {
        format!(
            "{}_{}_{:02}.{}",
            prefix, self.year, self.month, RASTER_EXTENSION
        )
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = LacunaError;

    /// Parse `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|e| {
                LacunaError::invalid_argument("month", format!("Expected YYYY-MM, got {}: {}", s, e))
            })?;
        Self::new(date.year(), date.month())
    }
}

/// Every month from January of `start_year` to December of `end_year`
pub fn expected_months(start_year: i32, end_year: i32) -> Result<Vec<MonthKey>> {
    if start_year > end_year {
        return Err(LacunaError::invalid_argument(
            "start_year",
            format!(
                "Start year {} is after end year {}",
                start_year, end_year
            ),
        ));
    }

    // Bounds both years before the span is computed
    MonthKey::new(start_year, 1)?;
    MonthKey::new(end_year, 12)?;

    let years = (i64::from(end_year) - i64::from(start_year) + 1) as usize;
    let mut months = Vec::with_capacity(years * 12);
    for year in start_year..=end_year {
        for month in 1..=12 {
            months.push(MonthKey::new(year, month)?);
        }
    }
    Ok(months)
}

/// Sorted names of the raster files directly inside `dir`
pub fn list_rasters(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        // Follows symlinks; dangling links are not files
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(RASTER_EXTENSION) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    debug!(directory = %dir.display(), count = names.len(), "Listed raster files");
    Ok(names)
}

/// One expected month and, if available, the file holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Position along the time axis
    pub index: usize,
    pub key: MonthKey,
    pub filename: String,
    pub path: Option<PathBuf>,
}

impl CatalogEntry {
    pub fn is_missing(&self) -> bool {
        self.path.is_none()
    }
}

/// Expected months reconciled against the files on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    directory: PathBuf,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Match `months` against `available` file names in `directory`.
    ///
    /// Files named in `skip` are treated as missing even if present.
    pub fn reconcile(
        directory: &Path,
        prefix: &str,
        months: &[MonthKey],
        available: &[String],
        skip: &HashSet<String>,
    ) -> Self {
        let available: HashSet<&str> = available.iter().map(String::as_str).collect();

        let entries = months
            .iter()
            .enumerate()
            .map(|(index, &key)| {
                let filename = key.filename(prefix);
                let path = if skip.contains(&filename) {
                    warn!(file = %filename, "Skipping listed file");
                    None
                } else if available.contains(filename.as_str()) {
                    Some(directory.join(&filename))
                } else {
                    warn!(file = %filename, month = %key, "Missing file");
                    None
                };
                CatalogEntry {
                    index,
                    key,
                    filename,
                    path,
                }
            })
            .collect();

        Self {
            directory: directory.to_path_buf(),
            entries,
        }
    }

    /// List `directory` and reconcile it against `start_year..=end_year`
    pub fn scan(
        directory: &Path,
        prefix: &str,
        start_year: i32,
        end_year: i32,
        skip: &HashSet<String>,
    ) -> Result<Self> {
        let months = expected_months(start_year, end_year)?;
        let available = list_rasters(directory)?;
        Ok(Self::reconcile(directory, prefix, &months, &available, skip))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries without a file
    pub fn missing(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.is_missing())
    }

    /// Paths of the entries that have a file, in time order
    pub fn present_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| e.path.as_deref())
    }

    /// Time index of `key`
    pub fn index_of(&self, key: MonthKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// First and last year covered
    pub fn year_range(&self) -> Option<(i32, i32)> {
        Some((self.entries.first()?.key.year, self.entries.last()?.key.year))
    }
}
