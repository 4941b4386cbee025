//! In-memory metadata source.
//!
//! Mirrors the group/attribute/dataset layout of an HDF5 file without the
//! system library, so extraction logic can be exercised anywhere.

use crate::error::{MetadataError, MetadataResult};
use crate::source::{MetadataSource, NumericArray};
use crate::value::RawValue;

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Relative remainder of `path` below `parent`, if `path` is a descendant.
fn below<'a>(parent: &str, path: &'a str) -> Option<&'a str> {
    if parent.is_empty() {
        return Some(path).filter(|p| !p.is_empty());
    }
    path.strip_prefix(parent)?.strip_prefix('/')
}

/// Groups and datasets held in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    groups: Vec<(String, Vec<(String, RawValue)>)>,
    datasets: Vec<(String, NumericArray)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add attributes to a group, creating it if needed.
    pub fn with_group<I, K>(mut self, path: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        let attrs = attributes.into_iter().map(|(k, v)| (k.into(), v));
        let path = normalize(path);
        match self.groups.iter_mut().find(|(p, _)| p == path) {
            Some((_, existing)) => existing.extend(attrs),
            None => self.groups.push((path.to_string(), attrs.collect())),
        }
        self
    }

    pub fn with_attribute(self, path: &str, name: &str, value: RawValue) -> Self {
        self.with_group(path, [(name, value)])
    }

    pub fn with_dataset(mut self, path: &str, array: NumericArray) -> Self {
        self.datasets.push((normalize(path).to_string(), array));
        self
    }
}

impl MetadataSource for MemorySource {
    fn has_group(&self, path: &str) -> bool {
        let path = normalize(path);
        if path.is_empty() {
            return true;
        }
        self.groups
            .iter()
            .any(|(p, _)| p == path || below(path, p).is_some())
            || self
                .datasets
                .iter()
                .any(|(p, _)| below(path, p).is_some())
    }

    fn read_attributes(&self, path: &str) -> MetadataResult<Vec<(String, RawValue)>> {
        let path = normalize(path);
        match self.groups.iter().find(|(p, _)| p == path) {
            Some((_, attrs)) => Ok(attrs.clone()),
            None if self.has_group(path) => Ok(Vec::new()),
            None => Err(MetadataError::MissingGroup(path.to_string())),
        }
    }

    fn child_groups(&self, path: &str) -> MetadataResult<Vec<String>> {
        let path = normalize(path);
        if !self.has_group(path) {
            return Err(MetadataError::MissingGroup(path.to_string()));
        }

        let from_groups = self
            .groups
            .iter()
            .filter_map(|(p, _)| below(path, p))
            .filter_map(|rel| rel.split('/').next());
        // A dataset's own name is not a group, only its ancestors are.
        let from_datasets = self
            .datasets
            .iter()
            .filter_map(|(p, _)| below(path, p))
            .filter_map(|rel| rel.split_once('/').map(|(first, _)| first));

        let mut children: Vec<String> = Vec::new();
        for name in from_groups.chain(from_datasets) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
        Ok(children)
    }

    fn read_array(&self, path: &str) -> MetadataResult<NumericArray> {
        let path = normalize(path);
        self.datasets
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, array)| array.clone())
            .ok_or_else(|| MetadataError::MissingDataset(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemorySource {
        MemorySource::new()
            .with_attribute("", "File Type", RawValue::text("HEC-RAS Geometry"))
            .with_attribute("Geometry", "Title", RawValue::text("Elk Middle"))
            .with_attribute("Geometry/2D Flow Areas/Elk", "Cell Count", RawValue::Int(10))
            .with_dataset(
                "Geometry/2D Flow Areas/Elk/Perimeter",
                NumericArray::from_points(&[[0.0, 0.0], [1.0, 1.0]]),
            )
            .with_dataset(
                "Geometry/2D Flow Areas/Cell Info",
                NumericArray::new(vec![1], vec![0.0]),
            )
    }

    #[test]
    fn test_implicit_intermediate_groups() {
        let source = sample();
        assert!(source.has_group(""));
        assert!(source.has_group("Geometry/2D Flow Areas"));
        assert!(!source.has_group("Plan Data"));
        assert!(source.read_attributes("Geometry/2D Flow Areas").unwrap().is_empty());
    }

    #[test]
    fn test_missing_group() {
        let err = sample().read_attributes("Results/Unsteady").unwrap_err();
        assert!(matches!(err, MetadataError::MissingGroup(p) if p == "Results/Unsteady"));
    }

    #[test]
    fn test_child_groups_exclude_datasets() {
        let source = sample();
        assert_eq!(source.child_groups("Geometry/2D Flow Areas").unwrap(), vec!["Elk"]);
        assert_eq!(source.child_groups("").unwrap(), vec!["Geometry"]);
    }

    #[test]
    fn test_read_array() {
        let source = sample();
        let perimeter = source.read_array("Geometry/2D Flow Areas/Elk/Perimeter").unwrap();
        assert_eq!(perimeter.to_points().unwrap().len(), 2);
        assert!(source.read_array("Geometry/Nope").is_err());
    }
}
