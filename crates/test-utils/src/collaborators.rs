//! In-memory metadata and raster collaborators.
//!
//! Both are keyed by object key and can be filled after being shared behind
//! an `Arc`, so fixtures can register sources as they write objects.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use catalog_common::{BoundingBox, CatalogError, CatalogResult};
use hdf_metadata::{MemorySource, MetadataOpener, MetadataSource};
use projection::SpatialRef;
use raster::{RasterInfo, RasterSource};

/// Opens registered [`MemorySource`]s by key.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    sources: Mutex<HashMap<String, MemorySource>>,
    opened: Mutex<Vec<String>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: impl Into<String>, source: MemorySource) {
        self.sources.lock().unwrap().insert(key.into(), source);
    }

    /// Keys opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataOpener for MemoryOpener {
    async fn open(&self, key: &str) -> CatalogResult<Box<dyn MetadataSource>> {
        self.opened.lock().unwrap().push(key.to_string());
        match self.sources.lock().unwrap().get(key) {
            Some(source) => Ok(Box::new(source.clone())),
            None => Err(CatalogError::object_access(key, "no metadata source registered")),
        }
    }
}

/// A raster as the catalog sees it.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    pub info: RasterInfo,
    pub all_nodata: bool,
}

impl MemoryRaster {
    /// A small geographic raster covering `bounds`, with nodata -9999.
    pub fn geographic(bounds: BoundingBox, all_nodata: bool) -> Self {
        Self {
            info: RasterInfo {
                width: 10,
                height: 10,
                bounds,
                crs: SpatialRef::wgs84(),
                nodata: Some(-9999.0),
            },
            all_nodata,
        }
    }
}

/// Serves registered [`MemoryRaster`]s by key.
#[derive(Debug, Default)]
pub struct MemoryRasterSource {
    rasters: Mutex<HashMap<String, MemoryRaster>>,
}

impl MemoryRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: impl Into<String>, raster: MemoryRaster) {
        self.rasters.lock().unwrap().insert(key.into(), raster);
    }

    fn get(&self, key: &str) -> CatalogResult<MemoryRaster> {
        self.rasters
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::Raster(format!("{}: not a registered raster", key)))
    }
}

#[async_trait]
impl RasterSource for MemoryRasterSource {
    async fn open(&self, key: &str) -> CatalogResult<RasterInfo> {
        Ok(self.get(key)?.info)
    }

    async fn all_samples_equal_nodata(&self, key: &str) -> CatalogResult<bool> {
        Ok(self.get(key)?.all_nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf_metadata::RawValue;

    #[tokio::test]
    async fn test_memory_opener() {
        let opener = MemoryOpener::new();
        opener.register(
            "a.p01.hdf",
            MemorySource::new().with_attribute("", "File Type", RawValue::text("HEC-RAS Results")),
        );

        let source = opener.open("a.p01.hdf").await.unwrap();
        assert_eq!(source.read_attributes("").unwrap().len(), 1);
        assert!(matches!(
            opener.open("b.p01.hdf").await,
            Err(CatalogError::ObjectAccess { .. })
        ));
        assert_eq!(opener.opened(), vec!["a.p01.hdf", "b.p01.hdf"]);
    }

    #[tokio::test]
    async fn test_memory_raster_source() {
        let rasters = MemoryRasterSource::new();
        rasters.register(
            "grid.tif",
            MemoryRaster::geographic(BoundingBox::new(0.0, 0.0, 1.0, 1.0), true),
        );

        assert_eq!(rasters.open("grid.tif").await.unwrap().width, 10);
        assert!(rasters.all_samples_equal_nodata("grid.tif").await.unwrap());
        assert!(rasters.open("missing.tif").await.is_err());
    }
}
