//! Depth-grid raster access.
//!
//! Depth grids are GeoTIFFs. Cataloging one needs two facts: where it is
//! (bounds and CRS, reprojected to EPSG:4326 for the catalog) and whether it
//! holds any data at all (not every sample is nodata).
//!
//! ```text
//! RasterSource::open(key)
//!      │
//!      ├─► ObjectCache hit: reuse bytes
//!      └─► miss: ObjectGateway::fetch
//!               │
//!               ▼
//!          GeoKeyDirectory → EPSG code
//!          Tiepoint + PixelScale → bounds
//!          GDAL_NODATA → nodata
//! ```

pub mod cache;
pub mod error;
pub mod geotiff;
pub mod source;

pub use cache::{CacheStats, ObjectCache};
pub use error::{RasterError, Result};
pub use geotiff::{all_samples_nodata, read_header, GeoTiffHeader};
pub use source::{GeoTiffRasterSource, RasterInfo, RasterSource};
