//! Coordinate reference system handling for model footprints.
//!
//! WKT from HEC-RAS files and EPSG codes from rasters are turned into PROJ
//! strings and run through `proj4rs`. Everything leaving this crate is
//! EPSG:4326 in lon/lat order.

pub mod error;
pub mod normalize;
pub mod polygon;
pub mod transform;
pub mod wkt;

pub use error::{ProjectionError, ProjectionResult};
pub use normalize::{
    normalize_bbox, normalize_perimeter, normalize_polygon, reproject_bounds, Footprint,
    SIMPLIFY_TOLERANCE,
};
pub use polygon::Polygon;
pub use transform::{SpatialRef, Transformer};
pub use wkt::{parse_wkt, wkt_to_proj, ProjDefinition};
