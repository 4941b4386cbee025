//! The object-store gateway contract.

use async_trait::async_trait;
use bytes::Bytes;
use catalog_common::CatalogResult;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One entry of an object listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Full object key within the bucket
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Content digest as reported by the store
    pub e_tag: Option<String>,
    pub last_modified: DateTime<Utc>,
    /// Storage class, when the backend reports one. `ObjectStorage` listings
    /// never do, so `storage:tier` falls back to the configured default.
    pub storage_class: Option<String>,
    pub region: String,
}

impl ObjectSummary {
    /// Final path segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Remote object access shared by every component of a build.
///
/// Implementations must return listings sorted by key so that builds over an
/// unchanged bucket are reproducible.
#[async_trait]
pub trait ObjectGateway: Send + Sync {
    /// List objects whose key starts with `prefix` (a plain string prefix,
    /// not a directory), keeping only keys `pattern` matches if one is given.
    /// Callers anchor their patterns.
    async fn list(&self, prefix: &str, pattern: Option<&Regex>) -> CatalogResult<Vec<ObjectSummary>>;

    /// Read a whole object.
    async fn fetch(&self, key: &str) -> CatalogResult<Bytes>;

    /// Write a whole object.
    async fn put(&self, key: &str, data: Bytes) -> CatalogResult<()>;

    /// Stable remote reference for a key, e.g. `s3://bucket/key`.
    fn href(&self, key: &str) -> String;
}
