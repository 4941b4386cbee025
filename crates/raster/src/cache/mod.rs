//! Cache for fetched raster objects.

mod object_cache;

pub use object_cache::{CacheStats, ObjectCache};
