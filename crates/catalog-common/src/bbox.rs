//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// Catalog documents carry geographic boxes (EPSG:4326, degrees, lon/lat order).
/// Before reprojection the same type holds boxes in a model's native projection.
/// Serializes as the STAC `[min_x, min_y, max_x, max_y]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", from = "[f64; 4]")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from HEC-RAS `Extents` ordering: `[min_x, max_x, min_y, max_y]`.
    pub fn from_ras_extents(extents: [f64; 4]) -> Self {
        let [min_x, max_x, min_y, max_y] = extents;
        Self::new(min_x, min_y, max_x, max_y)
    }

    /// Smallest box containing every given point. `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let [x, y] = iter.next()?;
        let mut bbox = Self::new(x, y, x, y);
        for [x, y] in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// STAC array form.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// All four coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Closed polygon ring tracing the box:
    /// `(min_x, min_y) → (min_x, max_y) → (max_x, max_y) → (max_x, min_y) → (min_x, min_y)`.
    pub fn ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.min_x, self.min_y],
            [self.min_x, self.max_y],
            [self.max_x, self.max_y],
            [self.max_x, self.min_y],
            [self.min_x, self.min_y],
        ]
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(values: [f64; 4]) -> Self {
        let [min_x, min_y, max_x, max_y] = values;
        Self::new(min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ras_extents() {
        let bbox = BoundingBox::from_ras_extents([100.0, 200.0, 10.0, 20.0]);
        assert_eq!(bbox, BoundingBox::new(100.0, 10.0, 200.0, 20.0));
    }

    #[test]
    fn test_serializes_as_array() {
        let bbox = BoundingBox::new(-82.0, 37.5, -80.25, 38.75);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[-82.0,37.5,-80.25,38.75]");

        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bbox);
    }
}
