//! Point transforms between coordinate reference systems.

use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, ProjectionResult};
use crate::wkt::{epsg_definition, wkt_to_proj, ProjDefinition};

/// A coordinate reference system as referenced by source data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialRef {
    /// EPSG code, as found in GeoTIFF geokeys
    Epsg(u16),
    /// WKT1 or WKT2 text, as found in HEC-RAS files
    Wkt(String),
    /// Raw PROJ string
    Proj(String),
}

impl SpatialRef {
    /// Geographic WGS84, longitude/latitude in degrees.
    pub fn wgs84() -> Self {
        SpatialRef::Epsg(4326)
    }

    pub fn definition(&self) -> ProjectionResult<ProjDefinition> {
        match self {
            SpatialRef::Epsg(code) => epsg_definition(*code),
            SpatialRef::Wkt(wkt) => wkt_to_proj(wkt),
            SpatialRef::Proj(proj) => Ok(ProjDefinition::from_proj_string(proj)),
        }
    }
}

impl std::fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpatialRef::Epsg(code) => write!(f, "EPSG:{}", code),
            SpatialRef::Wkt(wkt) => {
                let head: String = wkt.chars().take(48).collect();
                write!(f, "WKT {}", head)
            }
            SpatialRef::Proj(proj) => write!(f, "{}", proj),
        }
    }
}

/// A prepared transform from one CRS to another.
///
/// Geographic coordinates are degrees on both sides; proj4rs itself works in
/// radians, which is handled here.
pub struct Transformer {
    source: Proj,
    target: Proj,
    source_def: ProjDefinition,
    target_def: ProjDefinition,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("source", &self.source_def.proj_string)
            .field("target", &self.target_def.proj_string)
            .finish()
    }
}

fn build_proj(def: &ProjDefinition) -> ProjectionResult<Proj> {
    Proj::from_proj_string(&def.proj_string)
        .map_err(|e| ProjectionError::UnsupportedCrs(format!("{}: {:?}", def.proj_string, e)))
}

impl Transformer {
    pub fn new(source: &SpatialRef, target: &SpatialRef) -> ProjectionResult<Self> {
        let source_def = source.definition()?;
        let target_def = target.definition()?;
        Ok(Self {
            source: build_proj(&source_def)?,
            target: build_proj(&target_def)?,
            source_def,
            target_def,
        })
    }

    /// Transform into geographic WGS84.
    pub fn to_wgs84(source: &SpatialRef) -> ProjectionResult<Self> {
        Self::new(source, &SpatialRef::wgs84())
    }

    /// Transform one point. Fails on non-finite results.
    pub fn transform(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        let (x_in, y_in) = if self.source_def.geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x * self.source_def.to_meter, y * self.source_def.to_meter)
        };

        let mut point = (x_in, y_in, 0.0);
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| ProjectionError::Transform(format!("({}, {}): {:?}", x, y, e)))?;

        let (out_x, out_y) = if self.target_def.geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0 / self.target_def.to_meter, point.1 / self.target_def.to_meter)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProjectionError::Transform(format!(
                "({}, {}) has no finite image",
                x, y
            )));
        }
        Ok((out_x, out_y))
    }

    /// Transform every point, preserving order.
    pub fn transform_points(&self, points: &[[f64; 2]]) -> ProjectionResult<Vec<[f64; 2]>> {
        points
            .iter()
            .map(|[x, y]| self.transform(*x, *y).map(|(tx, ty)| [tx, ty]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_wkt::{ESRI_ALBERS_FT, WGS84};

    fn assert_close(actual: (f64, f64), expected: (f64, f64), tol: f64) {
        assert!(
            (actual.0 - expected.0).abs() < tol && (actual.1 - expected.1).abs() < tol,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_geographic_identity() {
        let t = Transformer::to_wgs84(&SpatialRef::Wkt(WGS84.to_string())).unwrap();
        assert_close(t.transform(-81.5, 38.25).unwrap(), (-81.5, 38.25), 1e-9);
    }

    #[test]
    fn test_albers_origin_in_feet() {
        let t = Transformer::to_wgs84(&SpatialRef::Wkt(ESRI_ALBERS_FT.to_string())).unwrap();
        assert_close(t.transform(0.0, 0.0).unwrap(), (-96.0, 23.0), 1e-6);
    }

    #[test]
    fn test_utm_central_meridian() {
        // EPSG:32617 = WGS 84 / UTM zone 17N, central meridian -81
        let t = Transformer::to_wgs84(&SpatialRef::Epsg(32617)).unwrap();
        assert_close(t.transform(500_000.0, 0.0).unwrap(), (-81.0, 0.0), 1e-6);
    }

    #[test]
    fn test_round_trip_through_albers() {
        let albers = SpatialRef::Wkt(ESRI_ALBERS_FT.to_string());
        let forward = Transformer::new(&SpatialRef::wgs84(), &albers).unwrap();
        let inverse = Transformer::to_wgs84(&albers).unwrap();
        let (x, y) = forward.transform(-81.6, 38.35).unwrap();
        assert_close(inverse.transform(x, y).unwrap(), (-81.6, 38.35), 1e-7);
    }

    #[test]
    fn test_unknown_epsg() {
        assert!(matches!(
            Transformer::to_wgs84(&SpatialRef::Epsg(1)),
            Err(ProjectionError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_invalid_wkt() {
        assert!(matches!(
            Transformer::to_wgs84(&SpatialRef::Wkt("not wkt at all".into())),
            Err(ProjectionError::InvalidWkt(_))
        ));
    }
}
