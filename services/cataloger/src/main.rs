//! HEC-RAS model cataloger.
//!
//! Discovers models in the configured bucket, builds the STAC tree, writes it
//! under `{output}/{catalog_id}-{YYYYmmdd-HHMM}` and optionally uploads it.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use cataloger::{metadata_opener, run, RunOptions};
use raster::GeoTiffRasterSource;
use ras_catalog::{CatalogBuilder, CatalogConfig};
use storage::{ObjectGateway, ObjectStorage, ObjectStorageConfig, RetryingGateway};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "cataloger")]
#[command(about = "Build a STAC catalog of HEC-RAS models from object storage")]
struct Args {
    /// Configuration file path (defaults plus CATALOG_* variables when omitted)
    #[arg(short, long, env = "CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory for catalog output
    #[arg(short, long, default_value = "./stac")]
    output: PathBuf,

    /// Remove an existing output directory before writing
    #[arg(long)]
    clean: bool,

    /// Upload the written tree to object storage under this prefix
    #[arg(long)]
    publish_prefix: Option<String>,

    /// Catalog only this model
    #[arg(short, long)]
    model: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs on stderr, the build report on stdout
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match args.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);
    let started = Utc::now();

    let config = match &args.config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::from_env()?,
    };
    info!(
        catalog = %config.catalog_id,
        bucket = %config.bucket,
        models_prefix = %config.models_prefix,
        "Starting cataloger"
    );

    let storage_config = ObjectStorageConfig {
        bucket: config.bucket.clone(),
        region: config.storage_region.clone(),
        ..ObjectStorageConfig::from_env()
    };
    let store: Arc<dyn ObjectGateway> = Arc::new(ObjectStorage::new(&storage_config)?);
    let gateway: Arc<dyn ObjectGateway> =
        Arc::new(RetryingGateway::new(store, config.retry.clone()));

    let builder = CatalogBuilder::new(
        gateway.clone(),
        metadata_opener(gateway.clone()),
        Arc::new(GeoTiffRasterSource::new(gateway.clone())),
        config,
    );

    let options = RunOptions {
        output_root: args.output.clone(),
        clean: args.clean,
        publish_prefix: args.publish_prefix.clone(),
        model: args.model.clone(),
    };
    let summary = run(&builder, gateway.as_ref(), &options, started).await?;

    print!("{}", summary.report);
    println!(
        "Wrote {} documents ({} bytes) to {}",
        summary.documents,
        summary.bytes,
        summary.output_dir.display()
    );
    if let (Some(prefix), Some(bytes)) = (&options.publish_prefix, summary.published_bytes) {
        println!("Published {} bytes under {}", bytes, prefix);
    }

    if summary.report.is_total_failure() {
        error!(
            discovered = summary.report.models_discovered,
            "No model could be cataloged"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
