//! Object storage gateway over `object_store` (S3/MinIO compatible).

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{aws::AmazonS3Builder, memory::InMemory, path::Path, ObjectMeta, ObjectStore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use catalog_common::{CatalogError, CatalogResult};

use crate::gateway::{ObjectGateway, ObjectSummary};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL; `None` uses the AWS default for the region
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: String,
    /// Access key ID; `None` falls back to the AWS credential chain
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// AWS region, also reported on every listed object
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: "kanawha-pilot".to_string(),
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            allow_http: false,
        }
    }
}

impl ObjectStorageConfig {
    /// Load from `S3_*` variables, falling back to the `AWS_*` names.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |primary: &str, fallback: &str| {
            std::env::var(primary)
                .or_else(|_| std::env::var(fallback))
                .ok()
                .filter(|v| !v.is_empty())
        };

        Self {
            endpoint: var("S3_ENDPOINT", "AWS_ENDPOINT_URL"),
            bucket: var("S3_BUCKET", "AWS_BUCKET").unwrap_or(defaults.bucket),
            access_key_id: var("S3_ACCESS_KEY", "AWS_ACCESS_KEY_ID"),
            secret_access_key: var("S3_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"),
            region: var("S3_REGION", "AWS_REGION").unwrap_or(defaults.region),
            allow_http: var("S3_ALLOW_HTTP", "AWS_ALLOW_HTTP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.allow_http),
        }
    }
}

/// Object storage client used as the catalog's gateway.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> CatalogResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            CatalogError::InvalidConfig(format!("Failed to create S3 client: {}", e))
        })?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        })
    }

    /// In-memory store, for tests and dry runs.
    pub fn in_memory(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Keys found under a string prefix, plus how many entries the store returned.
struct Walk {
    objects: Vec<ObjectMeta>,
    visited: usize,
}

impl ObjectStorage {
    async fn list_recursive(&self, root: Option<&Path>, walk: &mut Walk, prefix: &str) -> CatalogResult<()> {
        let mut stream = self.store.list(root);
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| CatalogError::object_access(prefix, format!("List failed: {}", e)))?
        {
            walk.visited += 1;
            if meta.location.as_ref().starts_with(prefix) {
                walk.objects.push(meta);
            }
        }
        Ok(())
    }

    /// Every object whose key starts with `prefix`.
    ///
    /// `object_store` lists whole path segments. A prefix ending in `/` is a
    /// directory and is listed directly. Otherwise the parent is listed one
    /// level deep and only the entries whose names start with the last
    /// segment are followed, so sibling directories are never walked.
    async fn walk(&self, prefix: &str) -> CatalogResult<Walk> {
        let mut walk = Walk {
            objects: Vec::new(),
            visited: 0,
        };
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            self.list_recursive(None, &mut walk, prefix).await?;
            return Ok(walk);
        }
        if prefix.ends_with('/') {
            self.list_recursive(Some(&Path::from(trimmed)), &mut walk, prefix)
                .await?;
            return Ok(walk);
        }

        let parent = trimmed.rsplit_once('/').map(|(parent, _)| Path::from(parent));
        let level = self
            .store
            .list_with_delimiter(parent.as_ref())
            .await
            .map_err(|e| CatalogError::object_access(prefix, format!("List failed: {}", e)))?;

        walk.visited += level.objects.len();
        walk.objects.extend(
            level
                .objects
                .into_iter()
                .filter(|meta| meta.location.as_ref().starts_with(prefix)),
        );
        for dir in level.common_prefixes {
            if dir.as_ref().starts_with(trimmed) {
                self.list_recursive(Some(&dir), &mut walk, prefix).await?;
            }
        }
        Ok(walk)
    }
}

#[async_trait]
impl ObjectGateway for ObjectStorage {
    #[instrument(skip(self, pattern), fields(bucket = %self.bucket, prefix = %prefix))]
    async fn list(&self, prefix: &str, pattern: Option<&Regex>) -> CatalogResult<Vec<ObjectSummary>> {
        let walk = self.walk(prefix).await?;
        let mut objects = Vec::new();

        for meta in walk.objects {
            let key = meta.location.to_string();
            if let Some(re) = pattern {
                if !re.is_match(&key) {
                    continue;
                }
            }
            objects.push(ObjectSummary {
                key,
                size: meta.size as u64,
                e_tag: meta.e_tag,
                last_modified: meta.last_modified,
                // `ObjectMeta` carries no storage class; the tier comes from config
                storage_class: None,
                region: self.region.clone(),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(count = objects.len(), visited = walk.visited, "Listed objects");
        Ok(objects)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    async fn fetch(&self, key: &str) -> CatalogResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| CatalogError::object_access(key, format!("Failed to read: {}", e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| CatalogError::object_access(key, format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, key = %key))]
    async fn put(&self, key: &str, data: Bytes) -> CatalogResult<()> {
        let location = Path::from(key);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| CatalogError::object_access(key, format!("Failed to write: {}", e)))?;

        Ok(())
    }

    fn href(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn kanawha_bucket() -> ObjectStorage {
        let storage = ObjectStorage::in_memory("kanawha-pilot", "us-east-1");
        for key in [
            "FFRD_Kanawha_Compute/ras/ElkMiddle/ElkMiddle.p01.hdf",
            "FFRD_Kanawha_Compute/ras/ElkMiddle/ElkMiddle.g01.hdf",
            "FFRD_Kanawha_Compute/ras_archive/Old/Old.p01.hdf",
            "FFRD_Kanawha_Compute/readme.txt",
            "FFRD_Kanawha_Compute/runs/1/ras/ElkMiddle/ElkMiddle.p01.hdf",
            "FFRD_Kanawha_Compute/runs/1/ras/ElkMiddle/ElkMiddle.log",
            "FFRD_Kanawha_Compute/runs/2/ras/ElkMiddle/ElkMiddle.p01.hdf",
            "FFRD_Kanawha_Compute/runs/2/depth-grids/ElkMiddle/grid.tif",
        ] {
            storage.put(key, Bytes::from_static(b"x")).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_walk_skips_sibling_directories() {
        let storage = kanawha_bucket().await;
        let walk = storage.walk("FFRD_Kanawha_Compute/ras").await.unwrap();

        let mut keys: Vec<String> = walk.objects.iter().map(|m| m.location.to_string()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "FFRD_Kanawha_Compute/ras/ElkMiddle/ElkMiddle.g01.hdf",
                "FFRD_Kanawha_Compute/ras/ElkMiddle/ElkMiddle.p01.hdf",
                "FFRD_Kanawha_Compute/ras_archive/Old/Old.p01.hdf",
            ]
        );
        // readme.txt at the parent level plus the three keys; runs/ is never listed
        assert_eq!(walk.visited, 4);
    }

    #[tokio::test]
    async fn test_walk_directory_prefix() {
        let storage = kanawha_bucket().await;
        let walk = storage.walk("FFRD_Kanawha_Compute/runs/1/").await.unwrap();
        assert_eq!(walk.objects.len(), 2);
        assert_eq!(walk.visited, 2);

        let everything = storage.walk("").await.unwrap();
        assert_eq!(everything.objects.len(), 8);
    }

    #[tokio::test]
    async fn test_list_filters_string_prefix_and_sorts() {
        let storage = ObjectStorage::in_memory("kanawha-pilot", "us-east-1");
        for key in [
            "ras/ElkMiddle/ElkMiddle.p01.hdf",
            "ras/ElkMiddle/ElkMiddle.g01.hdf",
            "ras/ElkMiddle/Other.prj",
        ] {
            storage.put(key, Bytes::from_static(b"x")).await.unwrap();
        }

        let listed = storage.list("ras/ElkMiddle/ElkMiddle", None).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["ras/ElkMiddle/ElkMiddle.g01.hdf", "ras/ElkMiddle/ElkMiddle.p01.hdf"]
        );
        assert!(listed.iter().all(|o| o.region == "us-east-1" && o.size == 1));
        // No storage class from the backend; callers use the configured tier
        assert!(listed.iter().all(|o| o.storage_class.is_none()));
    }

    #[tokio::test]
    async fn test_list_with_pattern() {
        let storage = ObjectStorage::in_memory("b", "r");
        storage.put("ras/A/A.p01.hdf", Bytes::from_static(b"1")).await.unwrap();
        storage.put("ras/A/A.p01", Bytes::from_static(b"1")).await.unwrap();

        let re = Regex::new(r"^.*\.p01\.hdf$").unwrap();
        let listed = storage.list("ras", Some(&re)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "ras/A/A.p01.hdf");
    }

    #[tokio::test]
    async fn test_fetch_missing_is_object_access() {
        let storage = ObjectStorage::in_memory("b", "r");
        let err = storage.fetch("missing/key").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_href() {
        let storage = ObjectStorage::in_memory("kanawha-pilot", "us-east-1");
        assert_eq!(storage.href("a/b.tif"), "s3://kanawha-pilot/a/b.tif");
    }
}
