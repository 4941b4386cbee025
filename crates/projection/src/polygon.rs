//! Footprint polygons with GeoJSON serialization.
//!
//! A thin wrapper over [`geo_types::Polygon`] so footprints serialize the way
//! STAC expects and keep the crate's [`BoundingBox`] at the boundary.

use catalog_common::BoundingBox;
use geo::BoundingRect;
use geo_types::LineString;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A single-ring polygon. The exterior is always closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon(geo_types::Polygon<f64>);

impl Polygon {
    /// Build from exterior vertices, closing the ring if needed.
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self(geo_types::Polygon::new(LineString::from(vertices), Vec::new()))
    }

    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self::new(bbox.ring())
    }

    /// Exterior ring as `[x, y]` pairs, first vertex repeated last.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        self.0.exterior().coords().map(|c| [c.x, c.y]).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.exterior().0.is_empty()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.0
            .bounding_rect()
            .map(|rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    pub fn as_geo(&self) -> &geo_types::Polygon<f64> {
        &self.0
    }

    /// GeoJSON geometry object.
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": [self.ring()],
        })
    }
}

impl From<geo_types::Polygon<f64>> for Polygon {
    fn from(polygon: geo_types::Polygon<f64>) -> Self {
        // Footprints carry no holes
        Self(geo_types::Polygon::new(polygon.exterior().clone(), Vec::new()))
    }
}

impl Serialize for Polygon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "Polygon")?;
        map.serialize_entry("coordinates", &[self.ring()])?;
        map.end()
    }
}
