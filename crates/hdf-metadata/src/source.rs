//! Access contracts for hierarchical metadata files.

use async_trait::async_trait;
use catalog_common::CatalogResult;

use crate::error::{MetadataError, MetadataResult};
use crate::value::RawValue;

/// A dense numeric dataset, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NumericArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self { shape, data }
    }

    /// Build an N×2 array from vertex pairs.
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        Self {
            shape: vec![points.len(), 2],
            data: points.iter().flatten().copied().collect(),
        }
    }

    /// Interpret as an N×2 vertex list.
    pub fn to_points(&self) -> MetadataResult<Vec<[f64; 2]>> {
        match self.shape.as_slice() {
            [rows, 2] if rows * 2 == self.data.len() => Ok(self
                .data
                .chunks_exact(2)
                .map(|xy| [xy[0], xy[1]])
                .collect()),
            shape => Err(MetadataError::InvalidFormat(format!(
                "expected an N x 2 vertex array, got shape {:?}",
                shape
            ))),
        }
    }
}

/// An opened hierarchical metadata file.
///
/// Group paths are `/`-separated names relative to the file root; the root
/// itself is `""`. Dropping the source releases the underlying handle.
pub trait MetadataSource: Send {
    fn has_group(&self, path: &str) -> bool;

    /// Every attribute of a group in storage order.
    fn read_attributes(&self, path: &str) -> MetadataResult<Vec<(String, RawValue)>>;

    /// Names of the direct child groups, in storage order.
    fn child_groups(&self, path: &str) -> MetadataResult<Vec<String>>;

    /// Read a numeric dataset.
    fn read_array(&self, path: &str) -> MetadataResult<NumericArray>;
}

/// Opens metadata files by object key.
#[async_trait]
pub trait MetadataOpener: Send + Sync {
    async fn open(&self, key: &str) -> CatalogResult<Box<dyn MetadataSource>>;
}

/// Join a group path and a child name.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    if parent.is_empty() {
        child.trim_matches('/').to_string()
    } else {
        format!("{}/{}", parent, child.trim_matches('/'))
    }
}
