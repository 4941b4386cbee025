//! Error types for HDF metadata extraction.

use catalog_common::CatalogError;
use thiserror::Error;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Error types for metadata extraction.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required group absent from the source
    #[error("Missing group: {0}")]
    MissingGroup(String),

    /// Required attribute absent from a group
    #[error("Missing attribute '{name}' in group '{group}'")]
    MissingAttribute { group: String, name: String },

    /// Required dataset absent from the source
    #[error("Missing dataset: {0}")]
    MissingDataset(String),

    /// Present but unreadable or of an unexpected shape
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl From<MetadataError> for CatalogError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Io(e) => CatalogError::Io(e),
            other => CatalogError::MissingMetadata(other.to_string()),
        }
    }
}
