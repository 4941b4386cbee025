//! One cataloging run: build the tree, write it locally, optionally publish.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use catalog_common::{CatalogError, CatalogResult};
use hdf_metadata::{MetadataOpener, MetadataSource};
use ras_catalog::{publish_directory, BuildReport, CatalogBuilder, CatalogWriter, FilesystemWriter};
use storage::ObjectGateway;

/// Where a run writes and what it catalogs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Parent of the per-run output directory
    pub output_root: PathBuf,
    /// Remove an existing output directory before writing
    pub clean: bool,
    /// Upload the written tree under this key prefix
    pub publish_prefix: Option<String>,
    /// Catalog only the model with this name
    pub model: Option<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub report: BuildReport,
    pub documents: usize,
    pub bytes: u64,
    pub published_bytes: Option<u64>,
}

/// `{root}/{catalog_id}-{YYYYmmdd-HHMM}`
pub fn output_dir(root: &Path, catalog_id: &str, started: DateTime<Utc>) -> PathBuf {
    root.join(format!("{}-{}", catalog_id, started.format("%Y%m%d-%H%M")))
}

/// Create the output directory, removing what is there first if `clean`.
pub async fn prepare_output(dir: &Path, clean: bool) -> Result<()> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        if clean {
            info!(dir = %dir.display(), "Removing existing output");
            tokio::fs::remove_dir_all(dir)
                .await
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
        } else {
            warn!(dir = %dir.display(), "Output directory exists, documents will be overwritten");
        }
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))
}

/// Stands in for the HDF5 reader in builds without it. Every open fails, so
/// HDF5 assets are cataloged with basic object metadata only.
#[derive(Debug, Default)]
pub struct UnavailableOpener;

#[async_trait]
impl MetadataOpener for UnavailableOpener {
    async fn open(&self, key: &str) -> CatalogResult<Box<dyn MetadataSource>> {
        Err(CatalogError::MissingMetadata(format!(
            "{}: cataloger was built without HDF5 support",
            key
        )))
    }
}

#[cfg(feature = "hdf5")]
pub fn metadata_opener(gateway: Arc<dyn ObjectGateway>) -> Arc<dyn MetadataOpener> {
    hdf_metadata::silence_hdf5_errors();
    Arc::new(hdf_metadata::Hdf5Opener::new(gateway))
}

#[cfg(not(feature = "hdf5"))]
pub fn metadata_opener(_gateway: Arc<dyn ObjectGateway>) -> Arc<dyn MetadataOpener> {
    warn!("Built without the hdf5 feature; HDF5 attributes and footprints will be missing");
    Arc::new(UnavailableOpener)
}

/// Build, write and optionally publish the catalog.
///
/// Errors only when discovery, writing or publishing fails; per-model
/// problems are in the returned report.
pub async fn run(
    builder: &CatalogBuilder,
    gateway: &dyn ObjectGateway,
    options: &RunOptions,
    started: DateTime<Utc>,
) -> Result<RunSummary> {
    let outcome = builder
        .build(options.model.as_deref())
        .await
        .context("Model discovery failed")?;

    let dir = output_dir(&options.output_root, &builder.config().catalog_id, started);
    prepare_output(&dir, options.clean).await?;

    let written = FilesystemWriter::new(&dir)
        .write(&outcome.catalog)
        .await
        .with_context(|| format!("Failed to write catalog to {}", dir.display()))?;
    info!(
        dir = %dir.display(),
        documents = written.documents,
        bytes = written.bytes,
        "Catalog written"
    );

    let published_bytes = match &options.publish_prefix {
        Some(prefix) => Some(
            publish_directory(gateway, &dir, prefix)
                .await
                .with_context(|| format!("Failed to publish catalog to {}", prefix))?,
        ),
        None => None,
    };

    Ok(RunSummary {
        output_dir: dir,
        report: outcome.report,
        documents: written.documents,
        bytes: written.bytes,
        published_bytes,
    })
}
