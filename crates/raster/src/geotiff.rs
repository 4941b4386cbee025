//! GeoTIFF georeferencing and sample scans over in-memory bytes.
//!
//! Only the tags needed to place a raster are read:
//!
//! | Tag   | Name                   |
//! |-------|------------------------|
//! | 33550 | ModelPixelScale        |
//! | 33922 | ModelTiepoint          |
//! | 34264 | ModelTransformation    |
//! | 34735 | GeoKeyDirectory        |
//! | 42113 | GDAL_NODATA            |

use std::io::Cursor;

use catalog_common::BoundingBox;
use projection::SpatialRef;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::error::{RasterError, Result};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Georeferencing of a GeoTIFF's first image.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffHeader {
    pub width: u32,
    pub height: u32,
    /// Outer edges of the pixel grid in the raster's CRS
    pub bounds: BoundingBox,
    pub crs: SpatialRef,
    pub nodata: Option<f64>,
}

fn decoder(data: &[u8]) -> Result<Decoder<Cursor<&[u8]>>> {
    Ok(Decoder::new(Cursor::new(data))?)
}

fn optional_f64_vec(decoder: &mut Decoder<Cursor<&[u8]>>, code: u16) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(tag(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

/// GeoKey values by key id. Only inline (SHORT) values are returned.
fn geo_keys(directory: &[u16]) -> Vec<(u16, u16)> {
    let Some(&count) = directory.get(3) else {
        return Vec::new();
    };
    directory[4..]
        .chunks_exact(4)
        .take(count as usize)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geo_key(keys: &[(u16, u16)], id: u16) -> Option<u16> {
    keys.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

fn crs_from_keys(keys: &[(u16, u16)]) -> Result<SpatialRef> {
    let projected = geo_key(keys, PROJECTED_CS_TYPE_GEO_KEY).filter(|c| *c != USER_DEFINED);
    let geographic = geo_key(keys, GEOGRAPHIC_TYPE_GEO_KEY).filter(|c| *c != USER_DEFINED);

    match (geo_key(keys, GT_MODEL_TYPE_GEO_KEY), projected, geographic) {
        (Some(MODEL_TYPE_GEOGRAPHIC), _, Some(code)) => Ok(SpatialRef::Epsg(code)),
        (_, Some(code), _) => Ok(SpatialRef::Epsg(code)),
        (_, None, Some(code)) => Ok(SpatialRef::Epsg(code)),
        _ => Err(RasterError::UnsupportedCrs(
            "GeoKey directory has no EPSG projected or geographic code".to_string(),
        )),
    }
}

fn parse_nodata(text: &str) -> Option<f64> {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .parse::<f64>()
        .ok()
}

/// Read georeferencing from GeoTIFF bytes.
pub fn read_header(data: &[u8]) -> Result<GeoTiffHeader> {
    let mut decoder = decoder(data)?;
    let (width, height) = decoder.dimensions()?;

    let directory = match decoder.find_tag(tag(GEO_KEY_DIRECTORY))? {
        Some(value) => value
            .into_u16_vec()
            .map_err(|e| RasterError::NotGeoreferenced(format!("GeoKeyDirectory: {}", e)))?,
        None => {
            return Err(RasterError::NotGeoreferenced(
                "missing GeoKeyDirectory".to_string(),
            ))
        }
    };
    let keys = geo_keys(&directory);
    let crs = crs_from_keys(&keys)?;

    let (origin_x, origin_y, scale_x, scale_y) = match (
        optional_f64_vec(&mut decoder, MODEL_TIEPOINT)?,
        optional_f64_vec(&mut decoder, MODEL_PIXEL_SCALE)?,
        optional_f64_vec(&mut decoder, MODEL_TRANSFORMATION)?,
    ) {
        (Some(tie), Some(scale), _) if tie.len() >= 6 && scale.len() >= 2 => {
            // Tie raster point (i, j) to model point (x, y)
            (tie[3] - tie[0] * scale[0], tie[4] + tie[1] * scale[1], scale[0], scale[1])
        }
        (_, _, Some(m)) if m.len() >= 8 => {
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(RasterError::NotGeoreferenced(
                    "rotated model transformation".to_string(),
                ));
            }
            (m[3], m[7], m[0], -m[5])
        }
        _ => {
            return Err(RasterError::NotGeoreferenced(
                "no tiepoint/pixel scale or model transformation".to_string(),
            ))
        }
    };

    // Point rasters reference pixel centres; shift to outer edges.
    let (origin_x, origin_y) = if geo_key(&keys, GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT) {
        (origin_x - scale_x / 2.0, origin_y + scale_y / 2.0)
    } else {
        (origin_x, origin_y)
    };

    let far_x = origin_x + width as f64 * scale_x;
    let far_y = origin_y - height as f64 * scale_y;
    let bounds = BoundingBox::new(
        origin_x.min(far_x),
        origin_y.min(far_y),
        origin_x.max(far_x),
        origin_y.max(far_y),
    );

    let nodata = match decoder.find_tag(tag(GDAL_NODATA))? {
        Some(value) => value.into_string().ok().as_deref().and_then(parse_nodata),
        None => None,
    };

    Ok(GeoTiffHeader {
        width,
        height,
        bounds,
        crs,
        nodata,
    })
}

fn matches_nodata(sample: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        sample.is_nan()
    } else {
        sample == nodata
    }
}

/// Samples compare in their own type for floats. Integers compare as f64,
/// so a fractional nodata never matches an integer sample.
fn chunk_is_nodata(chunk: &DecodingResult, nodata: f64) -> Result<bool> {
    macro_rules! all_nodata {
        ($samples:expr) => {
            $samples.iter().all(|v| matches_nodata(*v as f64, nodata))
        };
        ($samples:expr, $float:ty) => {{
            let nodata = nodata as $float;
            $samples
                .iter()
                .all(|v| matches_nodata(f64::from(*v), f64::from(nodata)))
        }};
    }
    Ok(match chunk {
        DecodingResult::U8(v) => all_nodata!(v),
        DecodingResult::U16(v) => all_nodata!(v),
        DecodingResult::U32(v) => all_nodata!(v),
        DecodingResult::U64(v) => all_nodata!(v),
        DecodingResult::I8(v) => all_nodata!(v),
        DecodingResult::I16(v) => all_nodata!(v),
        DecodingResult::I32(v) => all_nodata!(v),
        DecodingResult::I64(v) => all_nodata!(v),
        DecodingResult::F32(v) => all_nodata!(v, f32),
        DecodingResult::F64(v) => all_nodata!(v, f64),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(RasterError::UnsupportedSampleFormat(
                "unknown decoding result".to_string(),
            ))
        }
    })
}

/// True when every sample equals `nodata`. Without a nodata value no sample
/// can match, so the answer is `false`.
///
/// Scans chunk by chunk (strips or tiles) and stops at the first valid sample.
pub fn all_samples_nodata(data: &[u8], nodata: Option<f64>) -> Result<bool> {
    let Some(nodata) = nodata else {
        return Ok(false);
    };

    let mut decoder = decoder(data)?;
    let (width, height) = decoder.dimensions()?;
    let (chunk_width, chunk_height) = decoder.chunk_dimensions();
    if chunk_width == 0 || chunk_height == 0 {
        return Err(RasterError::Decode("zero-sized chunks".to_string()));
    }
    let chunks = width.div_ceil(chunk_width) * height.div_ceil(chunk_height);

    for index in 0..chunks {
        let chunk = decoder.read_chunk(index)?;
        if !chunk_is_nodata(&chunk, nodata)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_keys_inline_only() {
        let directory = [
            1, 1, 0, 3, //
            1024, 0, 1, 1, //
            1026, 34737, 10, 0, //
            3072, 0, 1, 26917,
        ];
        let keys = geo_keys(&directory);
        assert_eq!(keys, vec![(1024, 1), (3072, 26917)]);
    }

    #[test]
    fn test_geo_keys_truncated_directory() {
        assert!(geo_keys(&[1, 1]).is_empty());
        assert_eq!(geo_keys(&[1, 1, 0, 2, 1024, 0, 1, 1]), vec![(1024, 1)]);
    }

    #[test]
    fn test_crs_from_keys() {
        assert_eq!(
            crs_from_keys(&[(1024, 1), (3072, 5070)]).unwrap(),
            SpatialRef::Epsg(5070)
        );
        assert_eq!(
            crs_from_keys(&[(1024, 2), (2048, 4269)]).unwrap(),
            SpatialRef::Epsg(4269)
        );
        assert!(matches!(
            crs_from_keys(&[(1024, 1), (3072, USER_DEFINED)]),
            Err(RasterError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_parse_nodata() {
        assert_eq!(parse_nodata("-9999\0"), Some(-9999.0));
        assert_eq!(parse_nodata(" 0 "), Some(0.0));
        assert!(parse_nodata("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_nodata("none"), None);
    }

    #[test]
    fn test_matches_nodata() {
        assert!(matches_nodata(-9999.0, -9999.0));
        assert!(!matches_nodata(0.5, -9999.0));
        assert!(matches_nodata(f64::NAN, f64::NAN));
        assert!(!matches_nodata(1.0, f64::NAN));
    }

    #[test]
    fn test_f32_nodata_compared_as_f32() {
        // -9999.9 has no exact f32; stored samples hold the rounded value
        let dry = DecodingResult::F32(vec![-9999.9f32; 4]);
        assert!(chunk_is_nodata(&dry, -9999.9).unwrap());

        let wet = DecodingResult::F32(vec![-9999.9f32, 0.1, -9999.9, -9999.9]);
        assert!(!chunk_is_nodata(&wet, -9999.9).unwrap());

        let nan = DecodingResult::F32(vec![f32::NAN; 2]);
        assert!(chunk_is_nodata(&nan, f64::NAN).unwrap());
    }

    #[test]
    fn test_integer_samples_against_fractional_nodata() {
        let chunk = DecodingResult::I16(vec![-9999; 4]);
        assert!(chunk_is_nodata(&chunk, -9999.0).unwrap());
        assert!(!chunk_is_nodata(&chunk, -9999.5).unwrap());
    }

    #[test]
    fn test_not_a_tiff() {
        assert!(matches!(read_header(b"not a tiff"), Err(RasterError::Decode(_))));
    }
}
