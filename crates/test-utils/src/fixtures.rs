//! HEC-RAS model corpus fixtures.
//!
//! A [`Corpus`] writes placeholder objects into an in-memory bucket and
//! registers matching metadata and raster collaborators, laid out the way
//! the pilot bucket is:
//!
//! ```text
//! {models}/{model}/{model}.p01.hdf   plan output (model discovery)
//! {models}/{model}/{model}.g01.hdf   geometry with a 2D flow area
//! {runs}/{s}/ras/{model}/...         per-simulation outputs
//! {runs}/{s}/depth-grids/{model}/... per-simulation depth grids
//! ```

use bytes::Bytes;
use std::sync::Arc;

use catalog_common::{BoundingBox, CatalogResult};
use hdf_metadata::{MemorySource, NumericArray, RawValue};
use storage::{ObjectGateway, ObjectStorage};

use crate::collaborators::{MemoryOpener, MemoryRaster, MemoryRasterSource};

pub const BUCKET: &str = "kanawha-pilot";
pub const REGION: &str = "us-east-1";
pub const MODELS_PREFIX: &str = "FFRD_Kanawha_Compute/ras";
pub const RUNS_PREFIX: &str = "FFRD_Kanawha_Compute/runs";

/// Geographic WKT, so footprints equal the perimeter's own bounds.
pub const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;

/// Flow area outline used by [`geometry_source`].
pub const PERIMETER: [[f64; 2]; 4] = [[-81.6, 38.3], [-81.6, 38.4], [-81.5, 38.4], [-81.5, 38.3]];

/// Geometry file with root, `Geometry`, `Structures` and one 2D flow area.
pub fn geometry_source(title: &str) -> MemorySource {
    let flow_area = "Geometry/2D Flow Areas/Perimeter 1";
    MemorySource::new()
        .with_group(
            "",
            [
                ("File Type", RawValue::text("HEC-RAS Geometry")),
                ("Projection", RawValue::text(WGS84_WKT)),
            ],
        )
        .with_group(
            "Geometry",
            [
                ("Title", RawValue::text(title)),
                (
                    "Extents",
                    RawValue::Array(vec![
                        RawValue::Float(-81.6),
                        RawValue::Float(-81.5),
                        RawValue::Float(38.3),
                        RawValue::Float(38.4),
                    ]),
                ),
            ],
        )
        .with_attribute("Geometry/Structures", "Bridge/Culvert Count", RawValue::Int(3))
        .with_group(
            flow_area,
            [
                ("Cell Average Size", RawValue::Float(10_000.0)),
                ("Cell Count", RawValue::Int(1200)),
            ],
        )
        .with_dataset(
            &format!("{}/Perimeter", flow_area),
            NumericArray::from_points(&PERIMETER),
        )
}

/// Geometry file with no 2D flow areas group at all.
pub fn geometry_source_without_flow_area() -> MemorySource {
    MemorySource::new()
        .with_attribute("", "Projection", RawValue::text(WGS84_WKT))
        .with_attribute(
            "Geometry",
            "Extents",
            RawValue::Array(vec![
                RawValue::Float(-81.6),
                RawValue::Float(-81.5),
                RawValue::Float(38.3),
                RawValue::Float(38.4),
            ]),
        )
}

/// Plan file; with `results`, a completed unsteady run whose volume error
/// varies by simulation.
pub fn plan_source(results: bool, simulation: u32) -> MemorySource {
    let source = MemorySource::new()
        .with_group(
            "",
            [
                ("File Type", RawValue::text("HEC-RAS Results")),
                ("Projection", RawValue::text(WGS84_WKT)),
            ],
        )
        .with_group(
            "Plan Data/Plan Information",
            [
                ("Plan Name", RawValue::text("Base")),
                ("Simulation Start Time", RawValue::text("01Jan2020 00:00:00")),
            ],
        )
        .with_attribute("Plan Data/Plan Parameters", "HDF Write Warmup", RawValue::text("False"))
        .with_group(
            "Event Conditions/Meteorology/Precipitation",
            [
                ("Mode", RawValue::text("Gridded")),
                ("Projection", RawValue::text(WGS84_WKT)),
            ],
        );
    if !results {
        return source;
    }

    source
        .with_attribute(
            "Results/Unsteady",
            "Solution",
            RawValue::text("Unsteady Finished Successfully"),
        )
        .with_group(
            "Results/Unsteady/Summary",
            [
                ("Computation Time Total", RawValue::text("01:30:30")),
                (
                    "Run Time Window",
                    RawValue::text("01JAN2020 10:00:00 to 01JAN2020 11:30:30"),
                ),
            ],
        )
        .with_attribute(
            "Results/Unsteady/Summary/Volume Accounting",
            "Error Percent",
            RawValue::Float(simulation as f64 / 100.0),
        )
}

/// An in-memory bucket plus the collaborators that read it.
pub struct Corpus {
    pub storage: Arc<ObjectStorage>,
    pub opener: Arc<MemoryOpener>,
    pub rasters: Arc<MemoryRasterSource>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(ObjectStorage::in_memory(BUCKET, REGION)),
            opener: Arc::new(MemoryOpener::new()),
            rasters: Arc::new(MemoryRasterSource::new()),
        }
    }

    pub fn gateway(&self) -> Arc<dyn ObjectGateway> {
        self.storage.clone()
    }

    pub async fn put(&self, key: &str, contents: &'static [u8]) -> CatalogResult<()> {
        self.storage.put(key, Bytes::from_static(contents)).await
    }

    /// Key base of a model under the models prefix.
    pub fn model_key_base(name: &str) -> String {
        format!("{}/{}/{}", MODELS_PREFIX, name, name)
    }

    /// Model directory with plan output, geometry HDF and text inputs.
    pub async fn add_model(&self, name: &str) -> CatalogResult<()> {
        let base = Self::model_key_base(name);

        let plan = format!("{}.p01.hdf", base);
        self.put(&plan, b"plan").await?;
        self.opener.register(plan, plan_source(false, 0));

        let geometry = format!("{}.g01.hdf", base);
        self.put(&geometry, b"geometry").await?;
        self.opener.register(geometry, geometry_source(name));

        for ext in ["g01", "p01", "u01", "prj", "rasmap"] {
            self.put(&format!("{}.{}", base, ext), b"text").await?;
        }
        Ok(())
    }

    /// Plan output and log for one simulation of a model.
    pub async fn add_run(&self, name: &str, simulation: u32) -> CatalogResult<()> {
        let dir = format!("{}/{}/ras/{}", RUNS_PREFIX, simulation, name);

        let plan = format!("{}/{}.p01.hdf", dir, name);
        self.put(&plan, b"results").await?;
        self.opener.register(plan, plan_source(true, simulation));

        self.put(&format!("{}/{}.log", dir, name), b"log").await
    }

    /// A depth grid for one simulation of a model.
    pub async fn add_depth_grid(
        &self,
        name: &str,
        simulation: u32,
        grid: &str,
        bounds: BoundingBox,
        all_nodata: bool,
    ) -> CatalogResult<()> {
        let key = format!("{}/{}/depth-grids/{}/{}", RUNS_PREFIX, simulation, name, grid);
        self.put(&key, b"tiff").await?;
        self.rasters
            .register(key, MemoryRaster::geographic(bounds, all_nodata));
        Ok(())
    }
}
