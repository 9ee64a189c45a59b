//! Normalising and blending two rasters.

use ndarray::{Array2, Zip};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{LacunaError, Result};

/// Weights for [`add_weighted`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.0,
        }
    }
}

fn saturate_u8(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

/// Stretch a grid linearly so its minimum maps to 0 and its maximum to 255.
///
/// NaN cells are ignored when finding the range and come out as 0, as does
/// every cell of a constant grid.
pub fn normalize_min_max(grid: &Array2<f64>) -> Array2<u8> {
    let (min, max) = grid
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if max <= min {
        return Array2::zeros(grid.dim());
    }

    let scale = 255.0 / (max - min);
    grid.mapv(|v| saturate_u8((v - min) * scale))
}

/// `saturate(alpha * a + beta * b + gamma)` cell by cell
pub fn add_weighted(a: &Array2<u8>, b: &Array2<u8>, weights: BlendWeights) -> Result<Array2<u8>> {
    if a.dim() != b.dim() {
        return Err(LacunaError::ShapeMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }

    Ok(Zip::from(a).and(b).map_collect(|&x, &y| {
        saturate_u8(weights.alpha * f64::from(x) + weights.beta * f64::from(y) + weights.gamma)
    }))
}

/// Normalise both grids and blend them
pub fn combine(first: &Array2<f64>, second: &Array2<f64>, weights: BlendWeights) -> Result<Array2<u8>> {
    add_weighted(&normalize_min_max(first), &normalize_min_max(second), weights)
}

/// Write an 8-bit single-band TIFF
pub fn write_gray8(path: &Path, grid: &Array2<u8>) -> Result<()> {
    let (rows, cols) = grid.dim();
    let data: Vec<u8> = grid.iter().copied().collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    encoder.write_image::<colortype::Gray8>(cols as u32, rows as u32, &data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_endpoints() {
        let grid = array![[10.0, 20.0], [30.0, 50.0]];
        let normalized = normalize_min_max(&grid);
        assert_eq!(normalized, array![[0u8, 64], [128, 255]]);
    }

    #[test]
    fn test_normalize_constant_and_nan() {
        assert_eq!(normalize_min_max(&Array2::from_elem((2, 2), 3.0)), Array2::<u8>::zeros((2, 2)));

        let grid = array![[f64::NAN, 0.0], [1.0, 2.0]];
        assert_eq!(normalize_min_max(&grid), array![[0u8, 0], [128, 255]]);
    }

    #[test]
    fn test_add_weighted_saturates() {
        let a = array![[200u8, 10], [0, 255]];
        let b = array![[200u8, 20], [0, 255]];
        let weights = BlendWeights {
            alpha: 1.0,
            beta: 1.0,
            gamma: -5.0,
        };
        assert_eq!(add_weighted(&a, &b, weights).unwrap(), array![[255u8, 25], [0, 255]]);

        let blended = add_weighted(&a, &b, BlendWeights::default()).unwrap();
        assert_eq!(blended, array![[200u8, 15], [0, 255]]);
    }

    #[test]
    fn test_add_weighted_shape_mismatch() {
        let a = Array2::<u8>::zeros((2, 2));
        let b = Array2::<u8>::zeros((2, 3));
        assert!(matches!(
            add_weighted(&a, &b, BlendWeights::default()),
            Err(LacunaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_combine_writes_tiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.tif");
        let first = array![[0.0, 1.0], [2.0, 3.0]];
        let second = array![[3.0, 2.0], [1.0, 0.0]];

        let combined = combine(&first, &second, BlendWeights::default()).unwrap();
        write_gray8(&path, &combined).unwrap();

        let read_back = crate::stack::read_raster(&path).unwrap();
        assert_eq!(read_back.mapv(|v| v as u8), combined);
    }
}
