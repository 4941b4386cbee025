//! Error types for the RAS model cataloger.

use thiserror::Error;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type for catalog building.
///
/// Every variant is local to one asset, item or model unless stated otherwise;
/// the builder records them in its report and carries on with the siblings.
#[derive(Debug, Error)]
pub enum CatalogError {
    // === Extraction Errors ===
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("Geometry projection failed: {0}")]
    GeometryProjection(String),

    #[error("Raster read failed: {0}")]
    Raster(String),

    // === Storage Errors ===
    #[error("Object access failed for '{key}': {message}")]
    ObjectAccess { key: String, message: String },

    // === Assembly Errors ===
    #[error("No qualifying assets to deduplicate in item {0}")]
    EmptyAssetSet(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    /// Build an object access error for a key.
    pub fn object_access(key: impl Into<String>, message: impl ToString) -> Self {
        CatalogError::ObjectAccess {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Stable name of the error class, used in build reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::MissingMetadata(_) => "MissingMetadata",
            CatalogError::GeometryProjection(_) => "GeometryProjection",
            CatalogError::Raster(_) => "Raster",
            CatalogError::ObjectAccess { .. } => "ObjectAccess",
            CatalogError::EmptyAssetSet(_) => "EmptyAssetSet",
            CatalogError::InvalidConfig(_) => "InvalidConfig",
            CatalogError::Io(_) => "Io",
            CatalogError::Json(_) => "Json",
        }
    }

    /// Whether a retry could succeed. Only remote object access is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::ObjectAccess { .. })
    }
}
