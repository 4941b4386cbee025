//! Test support for the catalog crates.
//!
//! [`Corpus`] lays out HEC-RAS models, runs and depth grids in an in-memory
//! bucket and registers the metadata and raster sources that describe them,
//! so a `CatalogBuilder` can run end to end without HDF5 or real GeoTIFFs.
//!
//! ```ignore
//! let corpus = Corpus::new();
//! corpus.add_model("ElkMiddle").await?;
//! let builder = CatalogBuilder::new(corpus.gateway(), corpus.opener.clone(), corpus.rasters.clone(), config);
//! ```

pub mod collaborators;
pub mod fixtures;

pub use collaborators::{MemoryOpener, MemoryRaster, MemoryRasterSource};
pub use fixtures::*;

/// Assert two numbers differ by at most `epsilon`. Coordinates coming back
/// from a projection round trip are compared this way.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: {} is not within {} of {} (diff {})",
            left,
            epsilon,
            right,
            diff
        );
    }};
}

/// [`assert_approx_eq!`] on both halves of an `(x, y)` pair.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(-81.60001, -81.6, 1e-4);
        assert_approx_eq!(0.0, 0.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(38.4, 38.3, 0.01);
    }

    #[test]
    fn test_assert_coords_approx_eq_passes() {
        assert_coords_approx_eq!((-81.5, 38.30001), (-81.5, 38.3), 1e-4);
    }
}
