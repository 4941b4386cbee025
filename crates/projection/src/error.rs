//! Error types for projection operations.

use catalog_common::CatalogError;
use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Text is not well-formed WKT
    #[error("Invalid WKT: {0}")]
    InvalidWkt(String),

    /// Well-formed, but names a projection method or code we cannot build
    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    /// The transform engine rejected a point
    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Geometry has no vertices")]
    EmptyGeometry,
}

impl From<ProjectionError> for CatalogError {
    fn from(err: ProjectionError) -> Self {
        CatalogError::GeometryProjection(err.to_string())
    }
}
