//! Error types for raster access.

use catalog_common::CatalogError;
use thiserror::Error;

/// Errors that can occur while reading a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The bytes are not a readable TIFF.
    #[error("failed to decode raster: {0}")]
    Decode(String),

    /// The TIFF carries no usable georeferencing.
    #[error("raster is not georeferenced: {0}")]
    NotGeoreferenced(String),

    /// The GeoKey directory names a CRS we cannot resolve.
    #[error("unsupported raster CRS: {0}")]
    UnsupportedCrs(String),

    /// Sample type the nodata scan cannot compare.
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<RasterError> for CatalogError {
    fn from(err: RasterError) -> Self {
        CatalogError::Raster(err.to_string())
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
