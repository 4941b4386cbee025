//! Upload a written catalog directory to object storage.

use bytes::Bytes;
use std::path::Path;
use tracing::{debug, info};

use catalog_common::{CatalogError, CatalogResult};
use storage::ObjectGateway;

/// Upload every file under `local_path` to `{prefix}/{relative path}`.
///
/// Keys use `/` separators regardless of platform. Returns the total bytes
/// uploaded.
pub async fn publish_directory(
    gateway: &dyn ObjectGateway,
    local_path: &Path,
    prefix: &str,
) -> CatalogResult<u64> {
    let prefix = prefix.trim_end_matches('/');
    let mut total_size = 0u64;
    let mut files = 0usize;

    for entry in walkdir::WalkDir::new(local_path).sort_by_file_name() {
        let entry = entry.map_err(|e| CatalogError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(local_path)
            .map_err(|e| CatalogError::InvalidConfig(e.to_string()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let key = if prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", prefix, relative)
        };

        let data = tokio::fs::read(entry.path()).await?;
        let size = data.len() as u64;
        gateway.put(&key, Bytes::from(data)).await?;

        total_size += size;
        files += 1;
        debug!(key = %key, size, "Uploaded document");
    }

    info!(files, bytes = total_size, prefix = %prefix, "Catalog published");
    Ok(total_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::ObjectStorage;

    #[tokio::test]
    async fn test_publish_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cat-ras")).unwrap();
        std::fs::write(dir.path().join("catalog.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("cat-ras/collection.json"), b"{\"a\":1}").unwrap();

        let storage = ObjectStorage::in_memory("bucket", "us-east-1");
        let bytes = publish_directory(&storage, dir.path(), "stac/cat/")
            .await
            .unwrap();
        assert_eq!(bytes, 9);

        let listing = storage.list("stac/cat", None).await.unwrap();
        let keys: Vec<&str> = listing.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["stac/cat/cat-ras/collection.json", "stac/cat/catalog.json"]);
        assert_eq!(
            storage.fetch("stac/cat/catalog.json").await.unwrap(),
            Bytes::from_static(b"{}")
        );
    }
}
