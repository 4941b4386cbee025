//! The raster collaborator contract and its GeoTIFF implementation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use catalog_common::{BoundingBox, CatalogError, CatalogResult};
use projection::{reproject_bounds, SpatialRef};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use storage::ObjectGateway;

use crate::cache::{CacheStats, ObjectCache};
use crate::error::Result;
use crate::geotiff::{all_samples_nodata, read_header};

/// Default byte budget for fetched rasters kept between `open` and the scan.
pub const DEFAULT_CACHE_BYTES: usize = 256 * 1024 * 1024;

/// Run TIFF decoding on the blocking pool.
async fn decode<T, F>(data: Bytes, work: F) -> CatalogResult<T>
where
    T: Send + 'static,
    F: FnOnce(&[u8]) -> Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || work(&data))
        .await
        .map_err(|e| CatalogError::Raster(format!("decode task failed: {}", e)))?;
    Ok(result?)
}

/// What the catalog needs to know about a raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    /// Bounds in the raster's own CRS
    pub bounds: BoundingBox,
    pub crs: SpatialRef,
    pub nodata: Option<f64>,
}

impl RasterInfo {
    /// Bounds reprojected to EPSG:4326 with edge densification.
    pub fn geographic_bounds(&self) -> CatalogResult<BoundingBox> {
        Ok(reproject_bounds(&self.bounds, &self.crs, &SpatialRef::wgs84())?)
    }
}

/// Access to raster objects by key.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Read a raster's georeferencing.
    async fn open(&self, key: &str) -> CatalogResult<RasterInfo>;

    /// True when every sample of the raster is its nodata value.
    async fn all_samples_equal_nodata(&self, key: &str) -> CatalogResult<bool>;
}

/// GeoTIFF rasters fetched whole through the object gateway.
pub struct GeoTiffRasterSource {
    gateway: Arc<dyn ObjectGateway>,
    cache: Mutex<ObjectCache>,
}

impl GeoTiffRasterSource {
    pub fn new(gateway: Arc<dyn ObjectGateway>) -> Self {
        Self::with_cache_bytes(gateway, DEFAULT_CACHE_BYTES)
    }

    pub fn with_cache_bytes(gateway: Arc<dyn ObjectGateway>, cache_bytes: usize) -> Self {
        Self {
            gateway,
            cache: Mutex::new(ObjectCache::new(cache_bytes)),
        }
    }

    async fn bytes(&self, key: &str) -> CatalogResult<Bytes> {
        if let Some(data) = self.cache.lock().await.get(key) {
            return Ok(data);
        }
        let data = self.gateway.fetch(key).await?;
        debug!(size = data.len(), "Fetched raster");
        self.cache.lock().await.insert(key, data.clone());
        Ok(data)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }
}

#[async_trait]
impl RasterSource for GeoTiffRasterSource {
    #[instrument(skip(self), fields(key = %key))]
    async fn open(&self, key: &str) -> CatalogResult<RasterInfo> {
        let data = self.bytes(key).await?;
        let header = decode(data, read_header).await?;
        Ok(RasterInfo {
            width: header.width,
            height: header.height,
            bounds: header.bounds,
            crs: header.crs,
            nodata: header.nodata,
        })
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn all_samples_equal_nodata(&self, key: &str) -> CatalogResult<bool> {
        let data = self.bytes(key).await?;
        decode(data, |data| {
            let nodata = read_header(data)?.nodata;
            all_samples_nodata(data, nodata)
        })
        .await
    }
}
