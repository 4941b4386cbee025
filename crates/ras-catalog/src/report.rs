//! Outcome of one catalog build.

use serde::Serialize;
use std::fmt;

use catalog_common::CatalogError;

/// Where in the tree a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// The whole model was skipped
    Model,
    /// One simulation listing was skipped
    Simulation,
    /// An asset was cataloged without some fields or geometry
    Asset,
    /// An item was left without deduplicated properties
    Item,
}

/// A recoverable failure recorded during a build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialFailure {
    pub scope: FailureScope,
    /// Object key or node id the failure concerns
    pub key: String,
    /// Error class, see [`CatalogError::kind`]
    pub kind: String,
    pub reason: String,
}

impl PartialFailure {
    pub fn new(scope: FailureScope, key: impl Into<String>, error: &CatalogError) -> Self {
        Self {
            scope,
            key: key.into(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub models_discovered: usize,
    pub models_built: usize,
    pub failures: Vec<PartialFailure>,
}

impl BuildReport {
    /// True when models were found but none could be built.
    pub fn is_total_failure(&self) -> bool {
        self.models_discovered > 0 && self.models_built == 0
    }

    pub fn failures_of(&self, scope: FailureScope) -> impl Iterator<Item = &PartialFailure> {
        self.failures.iter().filter(move |f| f.scope == scope)
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = PartialFailure>) {
        self.failures.extend(failures);
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Built {}/{} models, {} partial failures",
            self.models_built,
            self.models_discovered,
            self.failures.len()
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  [{:?}] {} ({}): {}",
                failure.scope, failure.key, failure.kind, failure.reason
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_failure() {
        let mut report = BuildReport::default();
        assert!(!report.is_total_failure());

        report.models_discovered = 2;
        assert!(report.is_total_failure());

        report.models_built = 1;
        assert!(!report.is_total_failure());
    }

    #[test]
    fn test_summary() {
        let err = CatalogError::Raster("bad strip".to_string());
        let report = BuildReport {
            models_discovered: 1,
            models_built: 1,
            failures: vec![PartialFailure::new(FailureScope::Asset, "runs/1/a.tif", &err)],
        };

        let text = report.to_string();
        assert!(text.starts_with("Built 1/1 models, 1 partial failures"));
        assert!(text.contains("runs/1/a.tif (Raster)"));
        assert_eq!(report.failures_of(FailureScope::Asset).count(), 1);
        assert_eq!(report.failures_of(FailureScope::Model).count(), 0);
    }
}
