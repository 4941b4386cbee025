//! Full runs of the cataloger against an in-memory bucket.

use chrono::{TimeZone, Utc};
use std::path::Path;

use cataloger::{run, RunOptions};
use ras_catalog::{CatalogBuilder, CatalogConfig};
use storage::ObjectGateway;
use test_utils::{Corpus, BUCKET, MODELS_PREFIX, RUNS_PREFIX};

// ============================================================================
// Helpers
// ============================================================================

fn builder(corpus: &Corpus) -> CatalogBuilder {
    let config = CatalogConfig {
        bucket: BUCKET.to_string(),
        models_prefix: MODELS_PREFIX.to_string(),
        runs_prefix: RUNS_PREFIX.to_string(),
        simulations: 2,
        ..CatalogConfig::default()
    };
    CatalogBuilder::new(
        corpus.gateway(),
        corpus.opener.clone(),
        corpus.rasters.clone(),
        config,
    )
}

fn options(root: &Path, publish_prefix: Option<&str>) -> RunOptions {
    RunOptions {
        output_root: root.to_path_buf(),
        clean: true,
        publish_prefix: publish_prefix.map(str::to_string),
        model: None,
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_run_writes_tree() {
    let corpus = Corpus::new();
    corpus.add_model("ElkMiddle").await.unwrap();
    corpus.add_run("ElkMiddle", 1).await.unwrap();

    let root = tempfile::tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let builder = builder(&corpus);
    let summary = run(&builder, corpus.storage.as_ref(), &options(root.path(), None), started)
        .await
        .unwrap();

    assert_eq!(summary.output_dir, root.path().join("kanawha-models-20240501-0830"));
    assert!(!summary.report.is_total_failure());
    assert!(summary.documents >= 6);
    assert!(summary.published_bytes.is_none());

    let catalog = read_json(&summary.output_dir.join("catalog.json"));
    assert_eq!(catalog["type"], "Catalog");
    assert_eq!(catalog["id"], "kanawha-models");

    let model = summary
        .output_dir
        .join("kanawha-models-ras")
        .join("kanawha-models-ras-ElkMiddle")
        .join("collection.json");
    let model = read_json(&model);
    assert_eq!(model["type"], "Collection");
    assert_eq!(model["description"], "HEC-RAS Model: ElkMiddle");
}

#[tokio::test]
async fn test_run_publishes() {
    let corpus = Corpus::new();
    corpus.add_model("ElkMiddle").await.unwrap();

    let root = tempfile::tempdir().unwrap();
    let builder = builder(&corpus);
    let summary = run(
        &builder,
        corpus.storage.as_ref(),
        &options(root.path(), Some("stac/kanawha")),
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(summary.published_bytes, Some(summary.bytes));
    let published = corpus.storage.list("stac/kanawha/", None).await.unwrap();
    assert_eq!(published.len(), summary.documents);
    assert!(published.iter().any(|s| s.key == "stac/kanawha/catalog.json"));
}

#[tokio::test]
async fn test_run_with_unreadable_outputs() {
    let corpus = Corpus::new();
    let base = Corpus::model_key_base("Broken");
    corpus.put(&format!("{}.p01.hdf", base), b"x").await.unwrap();

    let root = tempfile::tempdir().unwrap();
    let builder = builder(&corpus);
    let summary = run(&builder, corpus.storage.as_ref(), &options(root.path(), None), Utc::now())
        .await
        .unwrap();

    // Unreadable outputs are partial failures; the model itself is still built
    assert_eq!(summary.report.models_built, 1);
    assert!(!summary.report.failures.is_empty());
    assert!(summary.output_dir.join("catalog.json").exists());
}

#[tokio::test]
async fn test_run_single_model() {
    let corpus = Corpus::new();
    corpus.add_model("ElkMiddle").await.unwrap();
    corpus.add_model("Gauley").await.unwrap();

    let root = tempfile::tempdir().unwrap();
    let builder = builder(&corpus);
    let mut options = options(root.path(), None);
    options.model = Some("Gauley".to_string());
    let summary = run(&builder, corpus.storage.as_ref(), &options, Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.report.models_discovered, 1);
    let models = summary.output_dir.join("kanawha-models-ras");
    assert!(models.join("kanawha-models-ras-Gauley").exists());
    assert!(!models.join("kanawha-models-ras-ElkMiddle").exists());
}
