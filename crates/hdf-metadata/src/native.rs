//! Native HDF5 reading through the system library.
//!
//! HDF5 needs a file path, so fetched bytes are written to a temp file first.
//! On Linux, we use `/dev/shm` (memory-backed tmpfs) when it is writable.
//! The temp file lives exactly as long as the [`Hdf5Source`] handle.

use async_trait::async_trait;
use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use tracing::{debug, instrument, warn};

use catalog_common::CatalogResult;
use storage::ObjectGateway;

use crate::error::{MetadataError, MetadataResult};
use crate::source::{MetadataOpener, MetadataSource, NumericArray};
use crate::value::RawValue;

/// Longest fixed-length string attribute we read.
const MAX_FIXED_STRING: usize = 1024;

/// Silence HDF5's automatic error printing to stderr.
///
/// Probing for optional groups makes the C library print diagnostics even
/// though the error is handled. Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An HDF5 file opened from bytes.
pub struct Hdf5Source {
    file: Option<hdf5::File>,
    temp_path: PathBuf,
}

impl Hdf5Source {
    /// Open HDF5 content held in memory.
    pub fn from_bytes(data: &[u8]) -> MetadataResult<Self> {
        silence_hdf5_errors();

        let temp_path = get_optimal_temp_dir().join(generate_temp_filename());
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(data)?;
        drop(file);

        match hdf5::File::open(&temp_path) {
            Ok(file) => Ok(Self {
                file: Some(file),
                temp_path,
            }),
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(MetadataError::InvalidFormat(format!("Failed to open HDF5: {}", e)))
            }
        }
    }

    fn file(&self) -> MetadataResult<&hdf5::File> {
        self.file
            .as_ref()
            .ok_or_else(|| MetadataError::InvalidFormat("HDF5 file already closed".to_string()))
    }

    fn group(&self, path: &str) -> MetadataResult<hdf5::Group> {
        let path = path.trim_matches('/');
        let name = if path.is_empty() { "/" } else { path };
        self.file()?
            .group(name)
            .map_err(|_| MetadataError::MissingGroup(path.to_string()))
    }
}

impl Drop for Hdf5Source {
    fn drop(&mut self) {
        // Close the handle before unlinking.
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            warn!(path = %self.temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

impl MetadataSource for Hdf5Source {
    fn has_group(&self, path: &str) -> bool {
        self.group(path).is_ok()
    }

    fn read_attributes(&self, path: &str) -> MetadataResult<Vec<(String, RawValue)>> {
        let group = self.group(path)?;
        let names = group
            .attr_names()
            .map_err(|e| MetadataError::InvalidFormat(format!("{}: {}", path, e)))?;

        let mut attrs = Vec::with_capacity(names.len());
        for name in names {
            let attr = group.attr(&name).map_err(|_| MetadataError::MissingAttribute {
                group: path.to_string(),
                name: name.clone(),
            })?;
            let value = read_attribute(&attr)
                .map_err(|e| MetadataError::InvalidFormat(format!("{}/{}: {}", path, name, e)))?;
            attrs.push((name, value));
        }
        Ok(attrs)
    }

    fn child_groups(&self, path: &str) -> MetadataResult<Vec<String>> {
        let group = self.group(path)?;
        let children = group
            .groups()
            .map_err(|e| MetadataError::InvalidFormat(format!("{}: {}", path, e)))?;
        Ok(children
            .iter()
            .map(|g| {
                let name = g.name();
                name.rsplit('/').next().unwrap_or_default().to_string()
            })
            .collect())
    }

    fn read_array(&self, path: &str) -> MetadataResult<NumericArray> {
        let path = path.trim_matches('/');
        let dataset = self
            .file()?
            .dataset(path)
            .map_err(|_| MetadataError::MissingDataset(path.to_string()))?;
        let data = dataset
            .read_raw::<f64>()
            .map_err(|e| MetadataError::InvalidFormat(format!("{}: {}", path, e)))?;
        Ok(NumericArray::new(dataset.shape(), data))
    }
}

/// Read one attribute into a [`RawValue`]. Scalars stay scalar; anything with
/// dimensions becomes an array.
fn read_attribute(attr: &hdf5::Attribute) -> hdf5::Result<RawValue> {
    let descriptor = attr.dtype()?.to_descriptor()?;
    let values: Vec<RawValue> = match &descriptor {
        TypeDescriptor::Float(_) => attr.read_raw::<f64>()?.into_iter().map(RawValue::Float).collect(),
        TypeDescriptor::Integer(_) => attr.read_raw::<i64>()?.into_iter().map(RawValue::Int).collect(),
        TypeDescriptor::Unsigned(_) => attr.read_raw::<u64>()?.into_iter().map(RawValue::UInt).collect(),
        TypeDescriptor::Boolean => attr.read_raw::<bool>()?.into_iter().map(RawValue::Bool).collect(),
        TypeDescriptor::FixedAscii(len) if *len <= MAX_FIXED_STRING => attr
            .read_raw::<FixedAscii<MAX_FIXED_STRING>>()?
            .into_iter()
            .map(|s| RawValue::Bytes(s.as_bytes().to_vec()))
            .collect(),
        TypeDescriptor::FixedUnicode(len) if *len <= MAX_FIXED_STRING => attr
            .read_raw::<FixedUnicode<MAX_FIXED_STRING>>()?
            .into_iter()
            .map(|s| RawValue::Bytes(s.as_bytes().to_vec()))
            .collect(),
        TypeDescriptor::VarLenAscii => attr
            .read_raw::<VarLenAscii>()?
            .into_iter()
            .map(|s| RawValue::Bytes(s.as_bytes().to_vec()))
            .collect(),
        TypeDescriptor::VarLenUnicode => attr
            .read_raw::<VarLenUnicode>()?
            .into_iter()
            .map(|s| RawValue::Bytes(s.as_bytes().to_vec()))
            .collect(),
        other => vec![RawValue::Other(format!("{:?}", other))],
    };

    if attr.is_scalar() {
        if let [value] = values.as_slice() {
            return Ok(value.clone());
        }
    }
    Ok(RawValue::Array(values))
}

/// Opens metadata files by fetching them through the object gateway.
pub struct Hdf5Opener {
    gateway: Arc<dyn ObjectGateway>,
}

impl Hdf5Opener {
    pub fn new(gateway: Arc<dyn ObjectGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MetadataOpener for Hdf5Opener {
    #[instrument(skip(self), fields(key = %key))]
    async fn open(&self, key: &str) -> CatalogResult<Box<dyn MetadataSource>> {
        let bytes = self.gateway.fetch(key).await?;
        debug!(size = bytes.len(), "Opening HDF5 file");
        let source = Hdf5Source::from_bytes(&bytes)?;
        Ok(Box::new(source))
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Get the optimal temp directory for HDF5 file operations.
///
/// On Linux, uses /dev/shm (memory-backed tmpfs) if available for faster I/O.
/// Falls back to the system temp directory on other platforms or if /dev/shm is unavailable.
fn get_optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        use std::path::Path;
        let shm_path = Path::new("/dev/shm");
        if shm_path.is_dir() {
            let test_path = shm_path.join(format!(".hdf_metadata_test_{}", std::process::id()));
            if std::fs::write(&test_path, b"test").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Unique temp file name: process ID, thread ID and a counter.
fn generate_temp_filename() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let tid = std::thread::current().id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("ras_metadata_{}_{:?}_{}.hdf", pid, tid, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_temp_dir() {
        let dir = get_optimal_temp_dir();
        assert!(dir.exists(), "Temp dir should exist");
    }

    #[test]
    fn test_temp_filename_uniqueness() {
        let name1 = generate_temp_filename();
        let name2 = generate_temp_filename();
        assert_ne!(name1, name2, "Temp filenames should be unique");
    }
}
