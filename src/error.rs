//! Error types for lacuna.
//!
//! A single error enum covers every failure the library can surface. Per-pixel
//! data insufficiency during interpolation is not an error and never appears
//! here; it is reported through [`crate::interpolation::SkipReporter`].

use thiserror::Error;

/// The main error type for lacuna operations.
#[derive(Error, Debug)]
pub enum LacunaError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding errors
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Array construction errors
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid argument errors
    #[error("Invalid argument: {param} - {message}")]
    InvalidArgument { param: String, message: String },

    /// Data not found errors
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Raster grids that should line up but don't
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Raster sample layouts we don't read
    #[error("Unsupported pixel format: {message}")]
    UnsupportedPixelFormat { message: String },

    /// The operation was cancelled before it finished
    #[error("Operation cancelled")]
    Cancelled,
}

impl LacunaError {
    /// Shorthand for an [`LacunaError::InvalidArgument`]
    pub fn invalid_argument(param: &str, message: impl Into<String>) -> Self {
        LacunaError::InvalidArgument {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with LacunaError
pub type Result<T> = std::result::Result<T, LacunaError>;
