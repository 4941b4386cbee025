//! Footprints in EPSG:4326 from native-projection geometry.

use catalog_common::BoundingBox;
use geo::Simplify;
use serde::Serialize;
use tracing::debug;

use crate::error::{ProjectionError, ProjectionResult};
use crate::polygon::Polygon;
use crate::transform::{SpatialRef, Transformer};

/// Perimeter simplification tolerance, in source projection units.
pub const SIMPLIFY_TOLERANCE: f64 = 0.001;

/// Points per bbox edge when densifying before reprojection.
pub const DENSIFY_POINTS: usize = 21;

/// A geographic footprint: lon/lat polygon plus its axis-aligned bbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    pub geometry: Polygon,
    pub bbox: BoundingBox,
}

impl Footprint {
    fn from_ring(ring: Vec<[f64; 2]>) -> ProjectionResult<Self> {
        let geometry = Polygon::new(ring);
        let bbox = geometry.bbox().ok_or(ProjectionError::EmptyGeometry)?;
        Ok(Self { geometry, bbox })
    }
}

/// Reproject a native bbox's ring into EPSG:4326.
pub fn normalize_bbox(bbox: &BoundingBox, crs: &SpatialRef) -> ProjectionResult<Footprint> {
    let transformer = Transformer::to_wgs84(crs)?;
    let ring = transformer.transform_points(&bbox.ring())?;
    Footprint::from_ring(ring)
}

/// Reproject an arbitrary ring into EPSG:4326 without simplification.
pub fn normalize_polygon(vertices: &[[f64; 2]], crs: &SpatialRef) -> ProjectionResult<Footprint> {
    if vertices.is_empty() {
        return Err(ProjectionError::EmptyGeometry);
    }
    let transformer = Transformer::to_wgs84(crs)?;
    let closed = Polygon::new(vertices.to_vec()).ring();
    Footprint::from_ring(transformer.transform_points(&closed)?)
}

/// Simplify a flow-area perimeter in source units, then reproject it.
pub fn normalize_perimeter(vertices: &[[f64; 2]], crs: &SpatialRef) -> ProjectionResult<Footprint> {
    if vertices.is_empty() {
        return Err(ProjectionError::EmptyGeometry);
    }
    let perimeter = Polygon::new(vertices.to_vec());
    let simplified = Polygon::from(perimeter.as_geo().simplify(&SIMPLIFY_TOLERANCE)).ring();
    debug!(
        before = vertices.len(),
        after = simplified.len(),
        "Simplified perimeter"
    );
    normalize_polygon(&simplified, crs)
}

/// Transform a bbox between CRSs, densifying each edge so curved images of
/// straight edges are covered.
pub fn reproject_bounds(
    bbox: &BoundingBox,
    source: &SpatialRef,
    target: &SpatialRef,
) -> ProjectionResult<BoundingBox> {
    let transformer = Transformer::new(source, target)?;
    let corners = [
        [bbox.min_x, bbox.min_y],
        [bbox.min_x, bbox.max_y],
        [bbox.max_x, bbox.max_y],
        [bbox.max_x, bbox.min_y],
    ];

    let steps = (DENSIFY_POINTS - 1) as f64;
    let mut points = Vec::with_capacity(4 * DENSIFY_POINTS);
    for i in 0..4 {
        let [x0, y0] = corners[i];
        let [x1, y1] = corners[(i + 1) % 4];
        for step in 0..DENSIFY_POINTS {
            let t = step as f64 / steps;
            points.push([x0 + (x1 - x0) * t, y0 + (y1 - y0) * t]);
        }
    }

    let projected = transformer.transform_points(&points)?;
    BoundingBox::from_points(projected).ok_or(ProjectionError::EmptyGeometry)
}
