//! Catalog tree assembly.
//!
//! ```text
//! Catalog {catalog_id}
//! └── Collection {catalog_id}-ras
//!     └── Collection {catalog_id}-ras-{model}            model files as assets
//!         └── Collection {catalog_id}-ras-{model}-r0001
//!             ├── Item {model}-r0001                     run outputs, one asset per file
//!             └── Collection {model}-r0001-depth-grids
//!                 └── Item {model}-r0001-{grid}.tif      one asset per simulation
//! ```
//!
//! Every object read goes through the injected collaborators. Failures below
//! the model level are logged and recorded in the [`BuildReport`]; the node
//! is still cataloged without the failed fields.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use catalog_common::{AttrValue, AttributeBag, BoundingBox, CatalogError, CatalogResult};
use hdf_metadata::{
    extract_attributes, flow_area_perimeter, geometry_attributes, plan_attributes, GroupSpec,
    MetadataOpener, MetadataResult, MetadataSource, PROJ_WKT2_KEY,
};
use projection::{normalize_bbox, normalize_perimeter, Footprint, Polygon, SpatialRef};
use raster::RasterSource;
use storage::{ObjectGateway, ObjectSummary};

use crate::assets::{
    basic_object_metadata, model_file_asset, realization_label, simulation_label, NON_NULL_KEY,
    REALIZATION_KEY, ROLE_DEPTH_GRID, ROLE_GEOMETRY, ROLE_OUTPUT, ROLE_OUTPUT_LOGS, SIMULATION_KEY,
};
use crate::cache::FootprintCache;
use crate::config::CatalogConfig;
use crate::dedup::dedupe_item;
use crate::extent::{aggregate_collection, finalize_item};
use crate::model::{
    Asset, Catalog, Collection, Extent, Item, MediaType, FILE_EXTENSION, PROJECTION_EXTENSION,
};
use crate::report::{BuildReport, FailureScope, PartialFailure};

const GEOMETRY_EXTENTS_KEY: &str = "geometry:extents";

static DEPTH_GRID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.tif$").expect("static regex"));

/// A finished tree and what went wrong while building it.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub catalog: Catalog,
    pub report: BuildReport,
}

/// One model's collection, if it could be built, plus its partial failures.
struct ModelOutcome {
    collection: Option<Collection>,
    failures: Vec<PartialFailure>,
}

fn record(failures: &mut Vec<PartialFailure>, scope: FailureScope, key: &str, error: &CatalogError) {
    warn!(key = %key, kind = error.kind(), error = %error, "Partial failure");
    failures.push(PartialFailure::new(scope, key, error));
}

fn basename(key_base: &str) -> &str {
    key_base.rsplit('/').next().unwrap_or(key_base)
}

/// Footprint from the first 2D flow area's perimeter, falling back to the
/// geometry extents when the file defines no flow area.
fn footprint_from_geometry(source: &dyn MetadataSource) -> CatalogResult<Footprint> {
    if let Some(perimeter) = flow_area_perimeter(source)? {
        return Ok(normalize_perimeter(
            &perimeter.vertices,
            &SpatialRef::Wkt(perimeter.wkt),
        )?);
    }

    let bag = extract_attributes(source, &[GroupSpec::root(), GroupSpec::new("Geometry", "Geometry")])?;
    let wkt = bag
        .get(PROJ_WKT2_KEY)
        .and_then(AttrValue::as_str)
        .ok_or_else(|| CatalogError::MissingMetadata("geometry projection".to_string()))?;
    let extents: Vec<f64> = match bag.get(GEOMETRY_EXTENTS_KEY) {
        Some(AttrValue::Array(values)) => values.iter().filter_map(AttrValue::as_f64).collect(),
        _ => Vec::new(),
    };
    let extents: [f64; 4] = extents
        .try_into()
        .map_err(|_| CatalogError::MissingMetadata(GEOMETRY_EXTENTS_KEY.to_string()))?;

    Ok(normalize_bbox(
        &BoundingBox::from_ras_extents(extents),
        &SpatialRef::Wkt(wkt.to_string()),
    )?)
}

/// Builds the catalog tree from a model corpus in object storage.
pub struct CatalogBuilder {
    gateway: Arc<dyn ObjectGateway>,
    metadata: Arc<dyn MetadataOpener>,
    rasters: Arc<dyn RasterSource>,
    config: CatalogConfig,
    footprints: FootprintCache,
}

impl CatalogBuilder {
    pub fn new(
        gateway: Arc<dyn ObjectGateway>,
        metadata: Arc<dyn MetadataOpener>,
        rasters: Arc<dyn RasterSource>,
        config: CatalogConfig,
    ) -> Self {
        let footprints = FootprintCache::new(config.footprint_cache_size);
        Self {
            gateway,
            metadata,
            rasters,
            config,
            footprints,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn footprint_cache(&self) -> &FootprintCache {
        &self.footprints
    }

    /// Key bases of every model with a plan output under the models prefix.
    pub async fn discover_models(&self) -> CatalogResult<Vec<String>> {
        let pattern = Regex::new(&format!("{}$", regex::escape(&self.config.plan_suffix)))
            .map_err(|e| CatalogError::InvalidConfig(format!("plan_suffix: {}", e)))?;
        let listing = self
            .gateway
            .list(&self.config.models_prefix, Some(&pattern))
            .await?;

        let models: Vec<String> = listing
            .iter()
            .filter_map(|summary| summary.key.strip_suffix(self.config.plan_suffix.as_str()))
            .map(str::to_string)
            .collect();
        info!(count = models.len(), prefix = %self.config.models_prefix, "Discovered models");
        Ok(models)
    }

    /// Discover and build every model, or only the one named `only`.
    ///
    /// Fails only when discovery fails; per-model problems land in the report.
    pub async fn build(&self, only: Option<&str>) -> CatalogResult<BuildOutcome> {
        let mut models = self.discover_models().await?;
        if let Some(name) = only {
            models.retain(|key_base| basename(key_base) == name);
            if models.is_empty() {
                warn!(model = %name, "Requested model not found");
            }
        }
        Ok(self.build_models(&models).await)
    }

    /// Build the tree for the given model key bases, in order.
    pub async fn build_models(&self, key_bases: &[String]) -> BuildOutcome {
        let mut report = BuildReport {
            models_discovered: key_bases.len(),
            ..BuildReport::default()
        };

        let outcomes: Vec<ModelOutcome> = stream::iter(key_bases)
            .map(|key_base| self.build_model(key_base))
            .buffered(self.config.max_concurrent_models.max(1))
            .collect()
            .await;

        let mut models = Collection::new(
            self.config.models_collection_id(),
            self.config.models_collection_title.as_str(),
            self.config.models_collection_description.as_str(),
        );
        for outcome in outcomes {
            report.extend(outcome.failures);
            if let Some(collection) = outcome.collection {
                report.models_built += 1;
                models.add_child(collection);
            }
        }
        aggregate_collection(&mut models);

        let mut catalog = Catalog::new(
            self.config.catalog_id.as_str(),
            self.config.catalog_title.as_str(),
            self.config.catalog_description.as_str(),
        );
        catalog.add_child(models);

        let stats = self.footprints.stats();
        debug!(hit_rate = stats.hit_rate(), "Footprint cache");
        info!(
            built = report.models_built,
            discovered = report.models_discovered,
            failures = report.failures.len(),
            "Catalog built"
        );
        BuildOutcome { catalog, report }
    }

    async fn build_model(&self, key_base: &str) -> ModelOutcome {
        let mut failures = Vec::new();
        match self.model_collection(key_base, &mut failures).await {
            Ok(collection) => ModelOutcome {
                collection: Some(collection),
                failures,
            },
            Err(e) => {
                record(&mut failures, FailureScope::Model, key_base, &e);
                ModelOutcome {
                    collection: None,
                    failures,
                }
            }
        }
    }

    #[instrument(skip_all, fields(model = %basename(key_base)))]
    async fn model_collection(
        &self,
        key_base: &str,
        failures: &mut Vec<PartialFailure>,
    ) -> CatalogResult<Collection> {
        let name = basename(key_base);
        info!("Building model");

        let pattern = Regex::new(&format!("^{}\\.", regex::escape(key_base)))
            .map_err(|e| CatalogError::InvalidConfig(format!("model key: {}", e)))?;
        let listing = self.gateway.list(key_base, Some(&pattern)).await?;

        let mut collection = Collection::new(
            format!("{}-{}", self.config.models_collection_id(), name),
            name,
            format!("HEC-RAS Model: {}", name),
        )
        .with_extension(PROJECTION_EXTENSION)
        .with_extension(FILE_EXTENSION);

        for summary in &listing {
            let asset = self.model_asset(summary, failures).await;
            collection
                .assets
                .entry(summary.filename().to_string())
                .or_insert(asset);
        }

        let footprint = self.model_footprint(key_base, failures).await;
        if let Some(footprint) = &footprint {
            collection.extent = Extent::from_bbox(footprint.bbox);
        }

        for &realization in &self.config.realizations {
            let child = self
                .realization_collection(name, realization, footprint.as_ref(), failures)
                .await;
            collection.add_child(child);
        }

        aggregate_collection(&mut collection);
        Ok(collection)
    }

    /// Open a metadata file and apply an extraction recipe to it.
    async fn extract<F>(&self, key: &str, recipe: F) -> CatalogResult<AttributeBag>
    where
        F: FnOnce(&dyn MetadataSource) -> MetadataResult<AttributeBag>,
    {
        let source = self.metadata.open(key).await?;
        Ok(recipe(source.as_ref())?)
    }

    async fn model_asset(&self, summary: &ObjectSummary, failures: &mut Vec<PartialFailure>) -> Asset {
        let mut asset = model_file_asset(self.gateway.href(&summary.key), summary, &self.config);
        let basic = asset.extra_fields.clone();

        let extracted = match (asset.media_type, asset.roles.first().map(String::as_str)) {
            (MediaType::Hdf5, Some(ROLE_GEOMETRY)) => Some(self.extract(&summary.key, geometry_attributes).await),
            (MediaType::Hdf5, Some(ROLE_OUTPUT)) => Some(
                self.extract(&summary.key, |source| plan_attributes(source, false))
                    .await,
            ),
            _ => None,
        };

        match extracted {
            Some(Ok(bag)) => asset.extra_fields = bag.merge(&basic),
            Some(Err(e)) => record(failures, FailureScope::Asset, &summary.key, &e),
            None => {}
        }
        debug!(key = %summary.key, roles = ?asset.roles, "Model asset");
        asset
    }

    /// Normalized footprint of a model, computed at most once per run.
    async fn model_footprint(&self, key_base: &str, failures: &mut Vec<PartialFailure>) -> Option<Footprint> {
        if let Some(cached) = self.footprints.get(key_base).await {
            return cached;
        }

        let key = format!("{}{}", key_base, self.config.geometry_suffix);
        let result = match self.metadata.open(&key).await {
            Ok(source) => footprint_from_geometry(source.as_ref()),
            Err(e) => Err(e),
        };
        let footprint = match result {
            Ok(footprint) => Some(footprint),
            Err(e) => {
                record(failures, FailureScope::Asset, &key, &e);
                None
            }
        };
        self.footprints.put(key_base, footprint.clone()).await;
        footprint
    }

    fn runs_prefix(&self, realization: u32, simulation: u32) -> String {
        let runs = self
            .config
            .runs_prefix
            .replace("{realization}", &realization.to_string());
        format!("{}/{}", runs.trim_end_matches('/'), simulation)
    }

    #[instrument(skip_all, fields(model = %model, realization = realization))]
    async fn realization_collection(
        &self,
        model: &str,
        realization: u32,
        footprint: Option<&Footprint>,
        failures: &mut Vec<PartialFailure>,
    ) -> Collection {
        let label = realization_label(realization);
        info!(realization = %label, "Building realization");

        let mut collection = Collection::new(
            format!("{}-{}-{}", self.config.models_collection_id(), model, label),
            format!("{}-{}", model, label),
            format!("Realization {} of HEC-RAS model {}", label, model),
        );

        let results = self.results_item(model, realization, footprint, failures).await;
        collection.add_child(results);

        let depth_grids = self.depth_grid_collection(model, realization, failures).await;
        collection.add_child(depth_grids);

        aggregate_collection(&mut collection);
        collection
    }

    async fn results_item(
        &self,
        model: &str,
        realization: u32,
        footprint: Option<&Footprint>,
        failures: &mut Vec<PartialFailure>,
    ) -> Item {
        let rlabel = realization_label(realization);
        let mut item = Item::new(format!("{}-{}", model, rlabel));
        if let Some(footprint) = footprint {
            item = item.with_geometry(footprint.geometry.clone());
        }
        item.stac_extensions.push(PROJECTION_EXTENSION.to_string());

        for simulation in 1..self.config.simulations {
            let prefix = format!("{}/ras/{}/", self.runs_prefix(realization, simulation), model);
            let listing = match self.gateway.list(&prefix, None).await {
                Ok(listing) => listing,
                Err(e) => {
                    record(failures, FailureScope::Simulation, &prefix, &e);
                    continue;
                }
            };

            for summary in &listing {
                let (key, asset) = self
                    .results_asset(summary, realization, simulation, failures)
                    .await;
                if !item.add_asset(key.clone(), asset) {
                    debug!(asset = %key, "Duplicate results asset key, keeping first");
                }
            }
        }

        finalize_item(&mut item);
        match dedupe_item(&mut item, self.config.dedup_min_assets) {
            Ok(common) => debug!(item = %item.id, promoted = common.len(), "Deduplicated results metadata"),
            Err(CatalogError::EmptyAssetSet(_)) => {
                info!(item = %item.id, "No model outputs to deduplicate")
            }
            Err(e) => record(failures, FailureScope::Item, &item.id, &e),
        }
        item
    }

    async fn results_asset(
        &self,
        summary: &ObjectSummary,
        realization: u32,
        simulation: u32,
        failures: &mut Vec<PartialFailure>,
    ) -> (String, Asset) {
        let filename = summary.filename();
        let run = format!("{}-{}", realization_label(realization), simulation_label(simulation));
        let href = self.gateway.href(&summary.key);

        let (key, mut asset) = if filename.ends_with(&self.config.plan_suffix) {
            let key = format!("{}-{}", run, filename);
            let asset = Asset::new(href, key.as_str())
                .with_media_type(MediaType::Hdf5)
                .with_role(ROLE_OUTPUT);
            (key, asset)
        } else if filename.ends_with(".log") {
            let key = format!("{}-rasoutput.log", run);
            let asset = Asset::new(href, key.as_str())
                .with_media_type(MediaType::Text)
                .with_role(ROLE_OUTPUT_LOGS);
            (key, asset)
        } else {
            let key = format!("{}_{}", run, filename);
            let mut asset = model_file_asset(href, summary, &self.config);
            asset.title = key.clone();
            (key, asset)
        };

        let mut fields = AttributeBag::new();
        if asset.has_role(ROLE_OUTPUT) && asset.media_type == MediaType::Hdf5 {
            match self
                .extract(&summary.key, |source| plan_attributes(source, true))
                .await
            {
                Ok(bag) => fields = bag,
                Err(e) => record(failures, FailureScope::Asset, &summary.key, &e),
            }
        }
        asset.extra_fields = fields
            .with(REALIZATION_KEY, realization)
            .with(SIMULATION_KEY, simulation)
            .merge(&basic_object_metadata(summary, &self.config));

        debug!(key = %summary.key, asset = %key, "Results asset");
        (key, asset)
    }

    async fn depth_grid_collection(
        &self,
        model: &str,
        realization: u32,
        failures: &mut Vec<PartialFailure>,
    ) -> Collection {
        let rlabel = realization_label(realization);
        let mut collection = Collection::new(
            format!("{}-{}-depth-grids", model, rlabel),
            format!("{}-{} Depth Grids", model, rlabel),
            format!("Depth grids for Realization {} of HEC-RAS model: {}", rlabel, model),
        );

        let mut items: IndexMap<String, Item> = IndexMap::new();

        for simulation in 1..self.config.simulations {
            let prefix = format!("{}/depth-grids/{}/", self.runs_prefix(realization, simulation), model);
            let listing = match self.gateway.list(&prefix, Some(&DEPTH_GRID_PATTERN)).await {
                Ok(listing) => listing,
                Err(e) => {
                    record(failures, FailureScope::Simulation, &prefix, &e);
                    continue;
                }
            };

            for summary in listing.iter().take(self.config.max_depth_grids) {
                let filename = summary.filename();
                let item_id = format!("{}-{}-{}", model, rlabel, filename);

                if !items.contains_key(&item_id) {
                    let item = self.depth_grid_item(&item_id, &summary.key, failures).await;
                    items.insert(item_id.clone(), item);
                }

                let asset = self
                    .depth_grid_asset(model, summary, realization, simulation, failures)
                    .await;
                if let Some(item) = items.get_mut(&item_id) {
                    item.add_asset(asset.title.clone(), asset);
                }
            }
        }

        for (_, mut item) in items {
            finalize_item(&mut item);
            collection.add_child(item);
        }
        aggregate_collection(&mut collection);
        info!(grids = collection.children.len(), "Depth grids cataloged");
        collection
    }

    async fn depth_grid_item(&self, id: &str, key: &str, failures: &mut Vec<PartialFailure>) -> Item {
        let item = Item::new(id);
        let bounds = match self.rasters.open(key).await {
            Ok(info) => info.geographic_bounds(),
            Err(e) => Err(e),
        };
        match bounds {
            Ok(bbox) => item.with_geometry(Polygon::from_bbox(&bbox)),
            Err(e) => {
                record(failures, FailureScope::Asset, key, &e);
                item
            }
        }
    }

    async fn depth_grid_asset(
        &self,
        model: &str,
        summary: &ObjectSummary,
        realization: u32,
        simulation: u32,
        failures: &mut Vec<PartialFailure>,
    ) -> Asset {
        let title = format!(
            "{}-{}-{}-{}",
            realization_label(realization),
            simulation_label(simulation),
            model,
            summary.filename()
        );
        let mut asset = Asset::new(self.gateway.href(&summary.key), title)
            .with_media_type(MediaType::GeoTiff)
            .with_role(ROLE_DEPTH_GRID);

        let mut fields = AttributeBag::new()
            .with(REALIZATION_KEY, realization)
            .with(SIMULATION_KEY, simulation);
        match self.rasters.all_samples_equal_nodata(&summary.key).await {
            Ok(empty) => fields.insert(NON_NULL_KEY, !empty),
            Err(e) => record(failures, FailureScope::Asset, &summary.key, &e),
        }
        asset.extra_fields = fields.merge(&basic_object_metadata(summary, &self.config));

        debug!(key = %summary.key, asset = %asset.title, "Depth grid asset");
        asset
    }
}
