//! Raster loading and time-series stacking.
//!
//! This module reads single-band TIFF grids into memory and assembles the
//! months of a [`Catalog`] into 3D volumes. Months without a usable file are
//! left as NaN so the interpolator can treat them as gaps.

use ndarray::{Array2, Array3, Axis};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{LacunaError, Result};
use crate::logging::log_stack_stats;

/// Grid shape as `(rows, cols)`
pub type GridShape = (usize, usize);

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    if !path.exists() {
        return Err(LacunaError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

/// Read the first band of a single-band TIFF as `f64`
pub fn read_raster(path: &Path) -> Result<Array2<f64>> {
    debug!(file = %path.display(), "Reading raster");
    let mut decoder = open_decoder(path)?;

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(LacunaError::UnsupportedPixelFormat {
                message: format!("{}: expected one sample per pixel, got {:?}", path.display(), other),
            })
        }
    }

    let (width, height) = decoder.dimensions()?;
    let shape = (height as usize, width as usize);

    let data: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(LacunaError::UnsupportedPixelFormat {
                message: format!("{}: unsupported sample type", path.display()),
            })
        }
    };

    Ok(Array2::from_shape_vec(shape, data)?)
}

/// Dimensions of a raster without decoding its pixels
pub fn raster_shape(path: &Path) -> Result<GridShape> {
    let mut decoder = open_decoder(path)?;
    let (width, height) = decoder.dimensions()?;
    Ok((height as usize, width as usize))
}

/// Shape of the first raster that can be opened
pub fn first_raster_shape<'a, I>(paths: I) -> Result<GridShape>
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in paths {
        match raster_shape(path) {
            Ok(shape) => return Ok(shape),
            Err(e) => warn!(file = %path.display(), error = %e, "Error reading file"),
        }
    }
    Err(LacunaError::DataNotFound {
        message: "No valid TIFF files found to determine array shape".to_string(),
    })
}

/// Write a grid as a single-band 64-bit float TIFF
pub fn write_raster(path: &Path, grid: &Array2<f64>) -> Result<()> {
    let (rows, cols) = grid.dim();
    let data: Vec<f64> = grid.iter().copied().collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    encoder.write_image::<colortype::Gray64Float>(cols as u32, rows as u32, &data)?;

    debug!(file = %path.display(), rows = rows, cols = cols, "Raster written");
    Ok(())
}

/// Read an entry's raster; unreadable files are logged and treated as absent
fn read_entry(entry: &CatalogEntry, shape: GridShape) -> Result<Option<Array2<f64>>> {
    let Some(path) = entry.path.as_deref() else {
        return Ok(None);
    };

    match read_raster(path) {
        Ok(grid) if grid.dim() == shape => Ok(Some(grid)),
        Ok(grid) => Err(LacunaError::ShapeMismatch {
            expected: shape,
            found: grid.dim(),
        }),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Error reading file");
            Ok(None)
        }
    }
}

/// Stack every catalog month into a `(time, rows, cols)` volume.
///
/// Missing or unreadable months stay NaN.
pub fn stack_catalog(catalog: &Catalog, shape: GridShape) -> Result<Array3<f64>> {
    let mut volume = Array3::from_elem((catalog.len(), shape.0, shape.1), f64::NAN);
    let mut present = 0usize;
    let mut missing = Vec::new();

    for entry in catalog.entries() {
        match read_entry(entry, shape)? {
            Some(grid) => {
                volume.index_axis_mut(Axis(0), entry.index).assign(&grid);
                present += 1;
            }
            None => missing.push(entry.key.to_string()),
        }
    }

    log_stack_stats(
        &catalog.directory().display().to_string(),
        volume.shape(),
        present,
        &missing,
    );

    Ok(volume)
}

/// Stack each calendar month separately into `(year, rows, cols)` volumes.
///
/// The result is keyed by month number 1..=12.
pub fn stack_by_calendar_month(
    catalog: &Catalog,
    shape: GridShape,
) -> Result<BTreeMap<u32, Array3<f64>>> {
    let (start_year, end_year) = catalog.year_range().ok_or_else(|| LacunaError::DataNotFound {
        message: "Catalog is empty".to_string(),
    })?;
    let years = (end_year - start_year + 1) as usize;

    let mut monthly: BTreeMap<u32, Array3<f64>> = (1..=12)
        .map(|month| (month, Array3::from_elem((years, shape.0, shape.1), f64::NAN)))
        .collect();

    for entry in catalog.entries() {
        let Some(grid) = read_entry(entry, shape)? else {
            continue;
        };
        let year_index = (entry.key.year - start_year) as usize;
        if let Some(volume) = monthly.get_mut(&entry.key.month) {
            volume.index_axis_mut(Axis(0), year_index).assign(&grid);
        }
    }

    info!(
        operation = "stack_by_month",
        years = years,
        rows = shape.0,
        cols = shape.1,
        "Monthly stacks assembled"
    );

    Ok(monthly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{expected_months, MonthKey};
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn grid(rows: usize, cols: usize, offset: f64) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| offset + (r * cols + c) as f64)
    }

    #[test]
    fn test_file_not_found() {
        let result = read_raster(Path::new("/nonexistent/file.tif"));
        match result.unwrap_err() {
            LacunaError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("grid.tif");
        let original = grid(3, 5, 0.25);

        write_raster(&path, &original)?;

        assert_eq!(raster_shape(&path)?, (3, 5));
        assert_eq!(read_raster(&path)?, original);
        Ok(())
    }

    #[test]
    fn test_first_raster_shape_skips_unreadable() -> Result<()> {
        let dir = tempdir()?;
        let broken = dir.path().join("broken.tif");
        std::fs::write(&broken, b"not a tiff")?;
        let good = dir.path().join("good.tif");
        write_raster(&good, &grid(2, 4, 0.0))?;

        assert_eq!(first_raster_shape([broken.as_path(), good.as_path()])?, (2, 4));
        assert!(matches!(
            first_raster_shape([broken.as_path()]),
            Err(LacunaError::DataNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_stack_catalog_fills_gaps_with_nan() -> Result<()> {
        let dir = tempdir()?;
        let months = expected_months(2010, 2010)?;
        for key in months.iter().filter(|k| k.month != 4) {
            write_raster(&dir.path().join(key.filename("img")), &grid(2, 3, key.month as f64))?;
        }

        let catalog = Catalog::scan(dir.path(), "img", 2010, 2010, &HashSet::new())?;
        let volume = stack_catalog(&catalog, (2, 3))?;

        assert_eq!(volume.shape(), &[12, 2, 3]);
        assert!(volume.index_axis(Axis(0), 3).iter().all(|v| v.is_nan()));
        assert_eq!(volume[[0, 0, 0]], 1.0);
        assert_eq!(volume[[11, 1, 2]], 12.0 + 5.0);
        Ok(())
    }

    #[test]
    fn test_stack_catalog_rejects_shape_mismatch() -> Result<()> {
        let dir = tempdir()?;
        let key = MonthKey::new(2010, 1)?;
        write_raster(&dir.path().join(key.filename("img")), &grid(4, 4, 0.0))?;

        let catalog = Catalog::scan(dir.path(), "img", 2010, 2010, &HashSet::new())?;
        assert!(matches!(
            stack_catalog(&catalog, (2, 3)),
            Err(LacunaError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_stack_by_calendar_month() -> Result<()> {
        let dir = tempdir()?;
        for key in expected_months(2003, 2005)? {
            if key == MonthKey::new(2004, 2)? {
                continue;
            }
            let value = (key.year - 2000) as f64 * 100.0 + key.month as f64;
            write_raster(&dir.path().join(key.filename("img")), &Array2::from_elem((2, 2), value))?;
        }

        let catalog = Catalog::scan(dir.path(), "img", 2003, 2005, &HashSet::new())?;
        let monthly = stack_by_calendar_month(&catalog, (2, 2))?;

        assert_eq!(monthly.len(), 12);
        for volume in monthly.values() {
            assert_eq!(volume.shape(), &[3, 2, 2]);
        }
        assert_eq!(monthly[&3][[1, 0, 0]], 403.0);
        assert!(monthly[&2][[1, 1, 1]].is_nan());
        assert_eq!(monthly[&2][[2, 1, 1]], 502.0);
        Ok(())
    }
}
